//! Virtual scrolling window over display rows.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VirtualWindow {
    /// First materialized display row
    pub start: usize,
    /// One past the last materialized display row
    pub end: usize,
    /// Pixel offset of `start` inside the scroll container
    pub offset_top: f32,
    /// Height of the whole scroll container
    pub content_height: f32,
}

impl VirtualWindow {
    /// Window for `total` rows at `scroll_offset`. Before the viewport has
    /// been measured (`viewport_height <= 0`) every row is materialized.
    pub fn compute(
        total: usize,
        scroll_offset: f32,
        viewport_height: f32,
        row_height: f32,
        overscan: usize,
    ) -> Self {
        let content_height = total as f32 * row_height.max(0.0);
        if viewport_height <= 0.0 || row_height <= 0.0 {
            return Self {
                start: 0,
                end: total,
                offset_top: 0.0,
                content_height,
            };
        }

        let first = (scroll_offset.max(0.0) / row_height).floor() as usize;
        let start = first.saturating_sub(overscan).min(total);
        // float casts saturate, so a huge viewport reads as usize::MAX
        let visible_count = ((viewport_height / row_height).ceil() as usize).min(total);
        let end = start.saturating_add(visible_count).saturating_add(overscan).min(total);

        Self {
            start,
            end,
            offset_top: start as f32 * row_height,
            content_height,
        }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn range(&self) -> std::ops::Range<usize> {
        self.start..self.end
    }
}

/// True when the viewport bottom is within one pixel of the content end.
pub fn reached_bottom(scroll_offset: f32, viewport_height: f32, content_height: f32) -> bool {
    viewport_height > 0.0 && scroll_offset + viewport_height >= content_height - 1.0
}
