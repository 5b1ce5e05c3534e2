use std::path::{Path, PathBuf};

use base64::Engine;
use eyre::{self as anyhow, Result};

use crate::GcpRow;

/// Appearance of the drawn GCPs.
#[derive(Debug, Clone)]
pub struct OverlayStyle {
    /// Circle diameter in pixels.
    pub marker_size: f64,
    pub edge_color: String,
    pub edge_width: f64,
    pub font_size: f64,
    pub font_color: String,
}

impl Default for OverlayStyle {
    fn default() -> Self {
        Self {
            marker_size: 200.0,
            edge_color: "red".into(),
            edge_width: 20.0,
            font_size: 200.0,
            font_color: "red".into(),
        }
    }
}

/// Files written by [draw_overlay].
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayFiles {
    pub svg: PathBuf,
    pub png: PathBuf,
}

/// Build an SVG with the encoded image `img_buf` as background and a circle
/// and ID label at every point.
pub fn overlay_svg(
    img_buf: &[u8],
    mime_type: &str,
    width: u32,
    height: u32,
    points: &[&GcpRow],
    style: &OverlayStyle,
) -> Result<Vec<u8>> {
    let radius = style.marker_size / 2.0;
    let circle_style = format!(
        "fill: none; stroke: {}; stroke-width: {};",
        style.edge_color, style.edge_width
    );
    let text_style = format!(
        "fill: {}; font-family: sans-serif; font-size: {}px;",
        style.font_color, style.font_size
    );

    let mut wtr = tagger::new(tagger::upgrade_write(Vec::<u8>::new()));
    wtr.elem("svg", |d| {
        d.attr("xmlns", "http://www.w3.org/2000/svg")?;
        d.attr("xmlns:xlink", "http://www.w3.org/1999/xlink")?;
        d.attr("width", width)?;
        d.attr("height", height)?;
        d.attr("viewBox", format_args!("0 0 {} {}", width, height))
    })?
    .build(|w| {
        let data_url = format!(
            "data:{};base64,{}",
            mime_type,
            base64::engine::general_purpose::STANDARD.encode(img_buf)
        );
        w.single("image", |d| {
            d.attr("x", 0)?;
            d.attr("y", 0)?;
            d.attr("width", width)?;
            d.attr("height", height)?;
            d.attr("xlink:href", data_url)
        })?;

        for pt in points.iter() {
            w.single("circle", |d| {
                d.attr("cx", pt.x)?;
                d.attr("cy", pt.y)?;
                d.attr("r", radius)?;
                d.attr("style", &circle_style)
            })?;
            // label at the lower right of the circle
            w.elem("text", |d| {
                d.attr("x", pt.x + radius)?;
                d.attr("y", pt.y + radius)?;
                d.attr("dy", "1em")?;
                d.attr("style", &text_style)
            })?
            .build(|w| w.put_raw(pt.id))?;
        }
        Ok(())
    })?;

    let fmt_wtr = wtr.into_writer();
    let svg_buf = {
        fmt_wtr.error?;
        fmt_wtr.inner
    };
    Ok(svg_buf)
}

/// Render `svg_buf` and save it as PNG at `out_fname`.
pub fn rasterize<P: AsRef<Path>>(svg_buf: &[u8], out_fname: P) -> Result<()> {
    let mut usvg_opt = usvg::Options::default();
    usvg_opt.fontdb_mut().load_system_fonts();

    let rtree = usvg::Tree::from_data(svg_buf, &usvg_opt)?;
    let pixmap_size = rtree.size().to_int_size();
    let mut pixmap = resvg::tiny_skia::Pixmap::new(pixmap_size.width(), pixmap_size.height())
        .ok_or_else(|| {
            anyhow::eyre!(
                "cannot allocate {}x{} pixmap",
                pixmap_size.width(),
                pixmap_size.height()
            )
        })?;
    resvg::render(
        &rtree,
        resvg::tiny_skia::Transform::default(),
        &mut pixmap.as_mut(),
    );
    pixmap.save_png(&out_fname)?;
    Ok(())
}

/// Draw `points` on the image at `img_path` and write
/// `<stem>.gcp.svg` and `<stem>.gcp.png` into `out_dir`.
pub fn draw_overlay(
    img_path: &Path,
    points: &[&GcpRow],
    style: &OverlayStyle,
    out_dir: &Path,
) -> Result<OverlayFiles> {
    let img_buf = std::fs::read(img_path)?;
    let format = image::guess_format(&img_buf)?;
    let img = image::load_from_memory_with_format(&img_buf, format)?;
    let (width, height) = (img.width(), img.height());

    let svg_buf = overlay_svg(
        &img_buf,
        format.to_mime_type(),
        width,
        height,
        points,
        style,
    )?;

    let stem = img_path
        .file_stem()
        .ok_or_else(|| anyhow::eyre!("no file name in \"{}\"", img_path.display()))?
        .to_string_lossy();
    let files = OverlayFiles {
        svg: out_dir.join(format!("{stem}.gcp.svg")),
        png: out_dir.join(format!("{stem}.gcp.png")),
    };
    std::fs::write(&files.svg, &svg_buf)?;
    rasterize(&svg_buf, &files.png)?;
    tracing::debug!("Saved GCP overlay to: {}", files.png.display());
    Ok(files)
}
