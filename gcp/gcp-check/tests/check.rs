use gcp_check::{Cli, run_cli};

#[test]
fn overlays_are_written_for_each_image() {
    let dir = tempfile::tempdir().unwrap();
    let images = dir.path().join("images");
    std::fs::create_dir(&images).unwrap();
    image::RgbImage::from_pixel(64, 48, image::Rgb([90, 120, 30]))
        .save(images.join("a.png"))
        .unwrap();
    image::RgbImage::from_pixel(32, 32, image::Rgb([90, 120, 30]))
        .save(images.join("b.png"))
        .unwrap();

    let gcp_file = dir.path().join("gcp_list.txt");
    std::fs::write(
        &gcp_file,
        "EPSG:23700\n\
         1 2 3 10 20 b.png 4\n\
         1 2 3 30 20 a.png 7\n\
         1 2 3 12 12 missing.png 7\n",
    )
    .unwrap();

    let out_dir = dir.path().join("out");
    let cli = Cli {
        gcp_file: gcp_file.try_into().unwrap(),
        path: Some(images.try_into().unwrap()),
        separator: " ".into(),
        id: None,
        output_dir: out_dir.clone().try_into().unwrap(),
        markersize: 10.0,
        edgecolor: "yellow".into(),
        edgewidth: 2.0,
        fontsize: 8.0,
        fontcolor: "red".into(),
    };
    run_cli(cli).unwrap();

    for stem in ["a", "b"] {
        let svg = std::fs::read_to_string(out_dir.join(format!("{stem}.gcp.svg"))).unwrap();
        assert_eq!(svg.matches("<circle").count(), 1);
    }
    assert_eq!(
        image::image_dimensions(out_dir.join("a.gcp.png")).unwrap(),
        (64, 48)
    );
    assert!(!out_dir.join("missing.gcp.svg").exists());
}

#[test]
fn id_filter_selects_images() {
    let dir = tempfile::tempdir().unwrap();
    for name in ["a.png", "b.png"] {
        image::GrayImage::from_pixel(16, 16, image::Luma([128]))
            .save(dir.path().join(name))
            .unwrap();
    }
    let gcp_file = dir.path().join("gcp_list.txt");
    std::fs::write(&gcp_file, "1 2 3 5 5 a.png 4\n1 2 3 6 6 b.png 9\n").unwrap();

    let out_dir = dir.path().join("out");
    let cli = Cli {
        gcp_file: gcp_file.try_into().unwrap(),
        path: None,
        separator: " ".into(),
        id: Some(9),
        output_dir: out_dir.clone().try_into().unwrap(),
        markersize: 4.0,
        edgecolor: "red".into(),
        edgewidth: 1.0,
        fontsize: 4.0,
        fontcolor: "red".into(),
    };
    run_cli(cli).unwrap();
    assert!(out_dir.join("b.gcp.png").exists());
    assert!(!out_dir.join("a.gcp.png").exists());
}
