use std::collections::BTreeMap;

use crate::detect::{Corners, MarkerDetection};

/// One marker instance on one image, ready for output.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionRecord {
    /// Pixel column of the marker center.
    pub x: i64,
    /// Pixel row of the marker center.
    pub y: i64,
    /// Image name as it should appear in the output.
    pub image: String,
    pub id: i32,
    pub corners: Corners,
}

/// Center of a marker: the mean of its corners, rounded half away from zero.
pub fn centroid(corners: &Corners) -> (i64, i64) {
    let n = corners.len() as f64;
    let (sx, sy) = corners.iter().fold((0.0f64, 0.0f64), |accum, c| {
        (accum.0 + c[0] as f64, accum.1 + c[1] as f64)
    });
    ((sx / n).round() as i64, (sy / n).round() as i64)
}

/// The images each marker ID was detected on, one entry per detection.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct OccurrenceIndex {
    by_id: BTreeMap<i32, Vec<String>>,
}

impl OccurrenceIndex {
    fn record(&mut self, id: i32, image: &str) {
        self.by_id.entry(id).or_default().push(image.to_string());
    }

    /// Number of detections of `id` over the whole run.
    pub fn count(&self, id: i32) -> usize {
        self.by_id.get(&id).map(Vec::len).unwrap_or(0)
    }

    pub fn images(&self, id: i32) -> &[String] {
        self.by_id.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// All IDs with their images, in ascending ID order.
    pub fn iter(&self) -> impl Iterator<Item = (i32, &[String])> {
        self.by_id.iter().map(|(id, imgs)| (*id, imgs.as_slice()))
    }
}

/// All detections of a run plus the per-ID occurrence index.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Aggregation {
    pub records: Vec<DetectionRecord>,
    pub occurrences: OccurrenceIndex,
}

impl Aggregation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add the markers found on `image`. An empty slice changes nothing.
    pub fn add_image(&mut self, image: &str, markers: &[MarkerDetection]) {
        for marker in markers {
            let (x, y) = centroid(&marker.corners);
            self.occurrences.record(marker.id, image);
            self.records.push(DetectionRecord {
                x,
                y,
                image: image.to_string(),
                id: marker.id,
                corners: marker.corners,
            });
        }
    }

    /// Log on how many images each ID was seen.
    pub fn log_summary(&self) {
        for (id, images) in self.occurrences.iter() {
            tracing::info!("GCP{}: on {} images {:?}", id, images.len(), images);
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn square(cx: f32, cy: f32, half: f32) -> Corners {
        [
            [cx - half, cy - half],
            [cx + half, cy - half],
            [cx + half, cy + half],
            [cx - half, cy + half],
        ]
    }

    #[test]
    fn centroid_of_square() {
        assert_eq!(centroid(&square(340.0, 210.0, 25.0)), (340, 210));
    }

    #[test]
    fn centroid_rounds_half_away_from_zero() {
        // x mean 10.5, y mean 20.5
        let corners = [[10.0, 20.0], [11.0, 20.0], [11.0, 21.0], [10.0, 21.0]];
        assert_eq!(centroid(&corners), (11, 21));
        // x mean 12.5, half to even would give 12
        let corners = [[12.0, 0.0], [13.0, 0.0], [13.0, 0.0], [12.0, 0.0]];
        assert_eq!(centroid(&corners), (13, 0));
        let corners = [[-12.0, 0.0], [-13.0, 0.0], [-13.0, 0.0], [-12.0, 0.0]];
        assert_eq!(centroid(&corners), (-13, 0));
    }

    #[test]
    fn centroid_of_skewed_quad() {
        let corners = [[100.2, 50.1], [140.9, 52.3], [138.0, 90.7], [98.4, 88.2]];
        // means: 119.375, 70.325
        assert_eq!(centroid(&corners), (119, 70));
    }

    #[test]
    fn images_without_markers_leave_no_trace() {
        let mut agg = Aggregation::new();
        agg.add_image("empty.jpg", &[]);
        assert!(agg.records.is_empty());
        assert!(agg.occurrences.is_empty());
    }

    #[test]
    fn occurrences_accumulate_per_id() {
        let m = |id, cx| MarkerDetection {
            id,
            corners: square(cx, 10.0, 2.0),
        };
        let mut agg = Aggregation::new();
        agg.add_image("a.jpg", &[m(3, 10.0), m(4, 20.0)]);
        agg.add_image("b.jpg", &[m(3, 30.0)]);
        agg.add_image("c.jpg", &[m(3, 40.0), m(3, 50.0)]);

        assert_eq!(agg.records.len(), 5);
        assert_eq!(agg.occurrences.count(3), 4);
        assert_eq!(agg.occurrences.count(4), 1);
        assert_eq!(agg.occurrences.count(5), 0);
        assert_eq!(
            agg.occurrences.images(3),
            &["a.jpg", "b.jpg", "c.jpg", "c.jpg"]
        );
        let order: Vec<(i32, i64)> = agg.records.iter().map(|r| (r.id, r.x)).collect();
        assert_eq!(order, vec![(3, 10), (4, 20), (3, 30), (3, 40), (3, 50)]);
    }
}
