// src/core/trace.rs
use crate::core::dictionary::trace_char;
use crate::core::layout::{slide_char_at, KeyLayout};
use crate::core::types::{slide_index, TracePoint, TracedKey, SLIDE_CHARS};
use log::debug;

/// Simplifies a stream of raw (x, y, time) touch samples into the small
/// ordered sequence of weighted trace points the matcher aligns against.
///
/// A point settles when the instantaneous speed drops below half the running
/// maximum since the last local minimum (the finger paused near a key).
/// While no slow-down is in progress the open point follows any sample whose
/// speed does not exceed the running minimum, so the open point always sits
/// at the latest slow sample of its span. Clusters of settled points within
/// half a key-spacing collapse into one averaged point.
pub struct TraceBuilder<'a> {
    layout: &'a KeyLayout,
    trace: Vec<TracePoint>,
    started: bool,
    last_x: f32,
    last_y: f32,
    last_time: u64,
    min_speed: f32,
    max_speed_since_min: f32,
    num_finalized: usize,
}

impl<'a> TraceBuilder<'a> {
    pub fn new(layout: &'a KeyLayout) -> Self {
        Self {
            layout,
            trace: Vec::new(),
            started: false,
            last_x: 0.0,
            last_y: 0.0,
            last_time: 0,
            min_speed: 0.0,
            max_speed_since_min: 0.0,
            num_finalized: 0,
        }
    }

    pub fn add_sample(&mut self, x: f32, y: f32, time: u64) {
        if !self.started {
            self.started = true;
            self.last_x = x;
            self.last_y = y;
            self.last_time = time;
            return;
        }
        let dt = time.saturating_sub(self.last_time).max(1) as f32;
        let dx = x - self.last_x;
        let dy = y - self.last_y;
        let speed = (dx * dx + dy * dy).sqrt() / dt;
        if self.trace.is_empty() {
            self.min_speed = speed;
            self.max_speed_since_min = speed;
            self.trace.push(TracePoint::new(self.last_x, self.last_y));
        }
        let spacing = self.layout.key_spacing();
        let scale = 1.0 / (spacing * spacing);
        let distances = self.layout.key_distances(x, y);
        let slow_down = (self.min_speed < 0.5 * self.max_speed_since_min
            && speed < 0.5 * self.max_speed_since_min)
            || self.trace.len() == 1;
        if slow_down {
            let mut point = TracePoint::new(x, y);
            for (d, sample) in point.key_distances.iter_mut().zip(&distances) {
                *d = d.min(*sample);
            }
            self.trace.push(point);
            self.min_speed = speed;
            self.max_speed_since_min = speed;
            // The cluster behind the point that just settled is complete once
            // it sits at least half a key away from that point.
            let first = self.num_finalized;
            let previous = self.trace.len() - 2;
            if scale * self.trace[first].distance2(&self.trace[previous]) >= 0.25 {
                self.collapse(first, previous);
                self.num_finalized += 1;
            }
        } else if speed <= self.min_speed {
            // Still decelerating: the open point follows, and the via keys it
            // has gathered belong to the span before the previous point.
            let len = self.trace.len();
            let moved: Vec<TracedKey> = self.trace[len - 1].via_keys.drain(..).collect();
            if len >= 2 {
                self.trace[len - 2].add_via_keys(&moved);
            }
            let current = &mut self.trace[len - 1];
            current.x = x;
            current.y = y;
            self.min_speed = speed;
            self.max_speed_since_min = speed;
        } else if speed > self.max_speed_since_min {
            self.max_speed_since_min = speed;
        }
        let current = self.trace.last_mut().expect("trace is non-empty");
        for (i, &d) in distances.iter().enumerate() {
            if d <= 0.5 {
                current.add_via_key(SLIDE_CHARS[i], d, time);
            }
        }
        self.last_x = x;
        self.last_y = y;
        self.last_time = time;
    }

    /// Finalizes the gesture: collapses trailing clusters, removes
    /// near-collinear interior points on long paths, assigns turn weights,
    /// and evaluates every point's key distances at its settled position.
    ///
    /// A result of zero or one points is a tap, not a drag; the caller
    /// routes it to the single-key path instead of the matcher.
    pub fn finish(mut self) -> Vec<TracePoint> {
        let spacing = self.layout.key_spacing();
        let scale = 1.0 / (spacing * spacing);
        let mut first = self.num_finalized;
        while first + 1 < self.trace.len() {
            let mut last = first + 1;
            while last < self.trace.len()
                && scale * self.trace[first].distance2(&self.trace[last]) < 0.25
            {
                last += 1;
            }
            self.collapse(first, last);
            first += 1;
        }
        let mut i = 1;
        while i + 1 < self.trace.len() {
            let dot = {
                let p1 = &self.trace[i - 1];
                let p2 = &self.trace[i];
                let p3 = &self.trace[i + 1];
                let dx1 = p2.x - p1.x;
                let dy1 = p2.y - p1.y;
                let dx2 = p3.x - p2.x;
                let dy2 = p3.y - p2.y;
                let len1 = (dx1 * dx1 + dy1 * dy1).sqrt();
                let len2 = (dx2 * dx2 + dy2 * dy2).sqrt();
                if len1 > 0.0 && len2 > 0.0 {
                    (dx1 * dx2 + dy1 * dy2) / (len1 * len2)
                } else {
                    1.0
                }
            };
            if dot > 0.95 && self.trace.len() > 10 {
                self.trace.remove(i);
            } else {
                self.trace[i].weight = 0.75 - 0.25 * dot;
                i += 1;
            }
        }
        for point in &mut self.trace {
            point.key_distances = self.layout.key_distances(point.x, point.y);
            point.finalize_via_keys();
        }
        debug!("trace finalized with {} points", self.trace.len());
        self.trace
    }

    /// Merges trace[first+1..last] into trace[first], averaging positions
    /// over trace[first..last].
    fn collapse(&mut self, first: usize, last: usize) {
        if last <= first + 1 {
            return;
        }
        let mut sum_x = self.trace[first].x;
        let mut sum_y = self.trace[first].y;
        for i in first + 1..last {
            let other = self.trace[i].clone();
            self.trace[first].merge_from(&other);
            sum_x += other.x;
            sum_y += other.y;
        }
        let count = (last - first) as f32;
        self.trace[first].x = sum_x / count;
        self.trace[first].y = sum_y / count;
        self.trace.drain(first + 1..last);
    }
}

/// Builds the trace an ideal gesture for `word` would produce: one point per
/// mappable character at the key center, with every key lying close to a
/// connecting segment recorded as a via key on the segment's destination
/// point, timestamped by its distance along the segment so pass order is
/// preserved. Powers replacement suggestions for words already committed.
pub fn trace_for_word(word: &str, layout: &KeyLayout) -> Vec<TracePoint> {
    let mut key_indices = Vec::new();
    let mut points: Vec<TracePoint> = Vec::new();
    for ch in word.chars() {
        let c = trace_char(ch).unwrap_or(b'\'');
        let slide = slide_index(c).expect("trace characters always have a slide index");
        if let Some(key) = layout.key_for_slide_char(slide) {
            let (x, y) = layout.position(key);
            key_indices.push(key);
            points.push(TracePoint::new(x, y));
        }
    }
    let spacing = layout.key_spacing();
    for i in 1..points.len() {
        let (x1, y1) = (points[i - 1].x, points[i - 1].y);
        let (x2, y2) = (points[i].x, points[i].y);
        let slide1 = layout.slide_char(key_indices[i - 1]);
        let slide2 = layout.slide_char(key_indices[i]);
        let mut dir_x = x2 - x1;
        let mut dir_y = y2 - y1;
        let len = (dir_x * dir_x + dir_y * dir_y).sqrt();
        if len == 0.0 {
            continue;
        }
        dir_x /= len;
        dir_y /= len;
        for key in 0..layout.len() {
            let Some(slide) = layout.slide_char(key) else {
                continue;
            };
            if Some(slide) == slide1 || Some(slide) == slide2 {
                continue;
            }
            let (kx, ky) = layout.position(key);
            let dx = kx - x1;
            let dy = ky - y1;
            let parallel = dx * dir_x + dy * dir_y;
            if parallel < 0.0 || parallel > len {
                continue;
            }
            let perp_x = dx - parallel * dir_x;
            let perp_y = dy - parallel * dir_y;
            let perp = ((perp_x * perp_x + perp_y * perp_y).sqrt() / spacing - 0.5).max(0.0);
            if perp < 0.5 {
                let time = (parallel / spacing * 1000.0) as u64;
                points[i].add_via_key(slide_char_at(slide), perp, time);
            }
        }
    }
    for point in &mut points {
        point.key_distances = layout.key_distances(point.x, point.y);
        point.finalize_via_keys();
    }
    points
}
