//! Text rendering of memory.
//!
//! A [`MemoryModel`] turns a [`MemoryDataModel`] into fixed-width text rows
//! for one [`Codec`]: 16 bytes per row, an address prefix, then the codec's
//! payload. It also maps between byte ranges and on-screen selections for
//! read/write highlighting and copy.
//!
//! Rendering never blocks and never fails. Data that is still being fetched
//! yields no lines and a loading notification; data that failed renders as
//! unknown glyphs.

mod codec;
mod layout;
mod selection;

pub use codec::{ascii_char, format_f32, format_f64, Codec, UNKNOWN_GLYPH};
pub use layout::{
    ColumnKind, ColumnRange, RowLayout, ADDRESS_SEPARATOR, ASCII_SEPARATOR, BYTES_PER_ROW,
    CHARS_PER_ADDRESS,
};
pub use selection::Selection;

use crate::error::{FetchError, FetchResult};
use crate::paged::MemoryDataModel;
use crate::range::ByteRange;
use crate::segment::MemorySegment;
use crate::task::FetchTask;

use serde::Serialize;
use std::fmt::Write;
use std::sync::Arc;

const ROW: usize = BYTES_PER_ROW as usize;

/// One rendered row
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TextLine {
    pub address: u64,
    pub text: String,
}

/// Clipboard content produced from a selection
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TextPayload {
    pub column: ColumnKind,
    pub text: String,
}

/// Outcome message shown when a load finishes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadMessage {
    /// The source has no data for the range
    Info(String),
    Error(String),
}

impl LoadMessage {
    pub fn for_outcome<T>(outcome: &FetchResult<T>) -> Option<Self> {
        match outcome {
            Ok(_) | Err(FetchError::Cancelled) => None,
            Err(FetchError::DataUnavailable(reason)) => Some(LoadMessage::Info(reason.clone())),
            Err(FetchError::Unexpected(cause)) => Some(LoadMessage::Error(cause.clone())),
        }
    }
}

/// Receives loading notifications from [`MemoryModel::get_lines`].
///
/// `stop_loading` is called from the runtime, not the render context; an
/// implementation typically schedules a repaint.
pub trait LoadSink: Send + Sync {
    fn start_loading(&self);
    fn stop_loading(&self, message: Option<LoadMessage>);
}

/// Rows `[start, end)` and the byte span backing them
#[derive(Debug, Clone, Copy)]
struct RowSpan {
    start: u64,
    end: u64,
    offset: u64,
    length: usize,
}

/// Fixed-width text view of a data model for one codec
#[derive(Debug, Clone)]
pub struct MemoryModel {
    data: MemoryDataModel,
    codec: Codec,
    layout: RowLayout,
}

impl MemoryModel {
    /// Render `data` with `codec`, aligning item boundaries to the codec's
    /// item size
    pub fn new(data: &MemoryDataModel, codec: Codec) -> Self {
        Self {
            data: data.align(codec.item_size() as u64),
            codec,
            layout: RowLayout::for_codec(codec),
        }
    }

    pub fn codec(&self) -> Codec {
        self.codec
    }

    pub fn data(&self) -> &MemoryDataModel {
        &self.data
    }

    /// Column groups of every row, left to right
    pub fn columns(&self) -> &[ColumnRange] {
        self.layout.groups()
    }

    pub fn get_line_count(&self) -> u64 {
        self.data.window().last_offset() / BYTES_PER_ROW + 1
    }

    pub fn get_line_length(&self) -> u32 {
        self.layout.line_length() as u32
    }

    /// Clamp `[start_row, end_row)` to the window
    fn rows(&self, start_row: u64, end_row: u64) -> Option<RowSpan> {
        let end = end_row.min(self.get_line_count());
        if start_row >= end {
            return None;
        }
        let offset = start_row * BYTES_PER_ROW;
        let last = ((end - 1) * BYTES_PER_ROW + (BYTES_PER_ROW - 1))
            .min(self.data.window().last_offset());
        let length = usize::try_from(last - offset).map_or(usize::MAX, |n| n.saturating_add(1));
        Some(RowSpan {
            start: start_row,
            end,
            offset,
            length,
        })
    }

    fn fetch(&self, rows: &RowSpan) -> FetchTask<MemorySegment> {
        self.data.get(rows.offset, rows.length)
    }

    /// Rendered rows `[start_row, end_row)`.
    ///
    /// Returns an empty list while the data is loading; `sink` is told when
    /// loading starts and again when it finishes, so the caller can ask
    /// again. Failed fetches render as unknown glyphs.
    pub fn get_lines(
        &self,
        start_row: u64,
        end_row: u64,
        sink: &Arc<dyn LoadSink>,
    ) -> Vec<TextLine> {
        let Some(rows) = self.rows(start_row, end_row) else {
            return Vec::new();
        };

        let task = self.fetch(&rows);
        match task.peek() {
            Some(Ok(segment)) => self.render(&rows, &segment),
            Some(Err(_)) => self.render(&rows, &MemorySegment::unknown(rows.length)),
            None => {
                sink.start_loading();
                let sink = Arc::clone(sink);
                self.data.runtime().spawn(async move {
                    let outcome = task.wait().await;
                    sink.stop_loading(LoadMessage::for_outcome(&outcome));
                });
                Vec::new()
            }
        }
    }

    /// Wait for rows `[start_row, end_row)` and render them
    pub async fn load_lines(&self, start_row: u64, end_row: u64) -> Vec<TextLine> {
        let Some(rows) = self.rows(start_row, end_row) else {
            return Vec::new();
        };
        let segment = self.load(&rows).await;
        self.render(&rows, &segment)
    }

    async fn load(&self, rows: &RowSpan) -> MemorySegment {
        match self.fetch(rows).wait().await {
            Ok(segment) => segment,
            Err(err) => {
                tracing::debug!("Rendering rows {}..{} as unknown: {}", rows.start, rows.end, err);
                MemorySegment::unknown(rows.length)
            }
        }
    }

    fn render(&self, rows: &RowSpan, segment: &MemorySegment) -> Vec<TextLine> {
        (rows.start..rows.end)
            .map(|row| self.render_row(row, &row_bytes(rows, segment, row)))
            .collect()
    }

    fn render_row(&self, row: u64, bytes: &MemorySegment) -> TextLine {
        let address = self.data.address() + row * BYTES_PER_ROW;
        let mut text = String::with_capacity(self.layout.line_length());
        let _ = write!(text, "{:016x}{}", address, ADDRESS_SEPARATOR);
        self.codec.write_row(&mut text, bytes);
        TextLine { address, text }
    }

    /// The column group a click at `col` selects
    pub fn get_selectable_region(&self, col: usize) -> Option<ColumnRange> {
        self.layout.selectable_region(col)
    }

    /// Highlights for the bytes read in rows `[start_row, end_row)`.
    /// Empty until the rows are loaded.
    pub fn get_reads(&self, start_row: u64, end_row: u64) -> Vec<Selection> {
        self.provenance(start_row, end_row, MemorySegment::reads)
    }

    /// Highlights for the bytes written in rows `[start_row, end_row)`
    pub fn get_writes(&self, start_row: u64, end_row: u64) -> Vec<Selection> {
        self.provenance(start_row, end_row, MemorySegment::writes)
    }

    fn provenance(
        &self,
        start_row: u64,
        end_row: u64,
        ranges: fn(&MemorySegment) -> Vec<ByteRange>,
    ) -> Vec<Selection> {
        let Some(rows) = self.rows(start_row, end_row) else {
            return Vec::new();
        };
        let Some(Ok(segment)) = self.fetch(&rows).peek() else {
            return Vec::new();
        };

        ranges(&segment)
            .into_iter()
            .filter(|range| !range.is_empty())
            .flat_map(|range| {
                self.layout
                    .highlight_groups()
                    .map(move |column| Selection::from_bytes(*column, rows.start, range))
            })
            .collect()
    }

    /// Clipboard text for `selection`.
    ///
    /// Copies the displayed text, except in the ASCII column where the
    /// underlying bytes are copied as characters.
    pub async fn get_copy_data(&self, selection: &Selection) -> Vec<TextPayload> {
        if selection.is_empty() {
            return Vec::new();
        }
        let Some(rows) = self.rows(selection.start_row, selection.end_row.saturating_add(1)) else {
            return Vec::new();
        };
        let segment = self.load(&rows).await;
        let column = selection.column;

        let parts: Vec<String> = (rows.start..rows.end)
            .filter_map(|row| {
                let (from, to) = selection.columns_on_row(row)?;
                let bytes = row_bytes(&rows, &segment, row);
                let text: String = match column.kind {
                    ColumnKind::Ascii => {
                        let first = column.byte_at(from);
                        let last = column.byte_at(to).min(bytes.len());
                        bytes
                            .bytes()
                            .get(first..last)
                            .unwrap_or_default()
                            .iter()
                            .map(|&b| b as char)
                            .collect()
                    }
                    _ => self
                        .render_row(row, &bytes)
                        .text
                        .get(from..to)
                        .unwrap_or_default()
                        .to_string(),
                };
                Some(text)
            })
            .collect();

        vec![TextPayload {
            column: column.kind,
            text: parts.join("\n"),
        }]
    }
}

/// The bytes of `row` within the segment backing `rows`
fn row_bytes(rows: &RowSpan, segment: &MemorySegment, row: u64) -> MemorySegment {
    let start = ((row - rows.start) * BYTES_PER_ROW) as usize;
    segment.sub_segment(start, ROW)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::range::AddressRange;
    use crate::source::MockMemorySource;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::runtime::Handle;
    use tokio::sync::Notify;

    #[derive(Default)]
    struct RecordingSink {
        started: AtomicUsize,
        messages: Mutex<Vec<Option<LoadMessage>>>,
        stopped: Notify,
    }

    impl LoadSink for RecordingSink {
        fn start_loading(&self) {
            self.started.fetch_add(1, Ordering::SeqCst);
        }

        fn stop_loading(&self, message: Option<LoadMessage>) {
            self.messages.lock().push(message);
            self.stopped.notify_one();
        }
    }

    impl RecordingSink {
        async fn wait_stopped(&self) {
            tokio::time::timeout(Duration::from_secs(5), self.stopped.notified())
                .await
                .unwrap();
        }
    }

    fn data_over(source: Arc<MockMemorySource>, start: u64, last: u64) -> MemoryDataModel {
        MemoryDataModel::new(
            source,
            AddressRange::new(start, last).unwrap(),
            Handle::current(),
        )
    }

    fn sink() -> (Arc<RecordingSink>, Arc<dyn LoadSink>) {
        let sink = Arc::new(RecordingSink::default());
        let dyn_sink: Arc<dyn LoadSink> = sink.clone();
        (sink, dyn_sink)
    }

    #[tokio::test]
    async fn test_end_to_end_byte_row() {
        let source = Arc::new(MockMemorySource::new(vec![0x41; 0x1000], 0x1000));
        let model = MemoryModel::new(&data_over(source, 0x1000, 0x1fff), Codec::Bytes);
        assert_eq!(model.get_line_count(), 256);
        assert_eq!(model.get_line_length(), 83);

        let lines = model.load_lines(0, 1).await;
        let expected = format!(
            "0000000000001000: {} {}",
            "41 ".repeat(16),
            "A".repeat(16)
        );
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].address, 0x1000);
        assert_eq!(lines[0].text, expected);
        assert_eq!(lines[0].text.len(), 83);
    }

    #[tokio::test]
    async fn test_get_lines_reports_loading_then_renders() {
        let source = Arc::new(MockMemorySource::new(vec![0x41; 0x100], 0).gated());
        let model = MemoryModel::new(&data_over(source.clone(), 0, 0xff), Codec::Bytes);
        let (recorder, sink) = sink();

        assert!(model.get_lines(0, 4, &sink).is_empty());
        assert_eq!(recorder.started.load(Ordering::SeqCst), 1);

        source.release();
        recorder.wait_stopped().await;
        assert_eq!(*recorder.messages.lock(), vec![None]);

        let lines = model.get_lines(0, 4, &sink);
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[3].address, 0x30);
        assert_eq!(recorder.started.load(Ordering::SeqCst), 1);
        assert_eq!(source.fetch_count(), 1);
    }

    #[tokio::test]
    async fn test_failed_fetch_renders_unknown_and_reports_error() {
        let source = Arc::new(MockMemorySource::new(vec![0x41; 0x100], 0).gated());
        source.fail_range(
            AddressRange::new(0, 0xff).unwrap(),
            FetchError::unexpected("link down"),
        );
        let model = MemoryModel::new(&data_over(source.clone(), 0, 0xff), Codec::Bytes);
        let (recorder, sink) = sink();

        assert!(model.get_lines(0, 1, &sink).is_empty());
        source.release();
        recorder.wait_stopped().await;
        assert_eq!(
            *recorder.messages.lock(),
            vec![Some(LoadMessage::Error("link down".to_string()))]
        );

        // The failure is handed out once as unknown bytes
        let lines = model.get_lines(0, 1, &sink);
        assert!(lines[0].text.starts_with("0000000000000000: ?? ?? "));
    }

    #[tokio::test]
    async fn test_unavailable_data_is_informational() {
        let source = Arc::new(MockMemorySource::new(vec![0; 0x100], 0).gated());
        source.fail_range(
            AddressRange::new(0, 0xff).unwrap(),
            FetchError::unavailable("before capture start"),
        );
        let model = MemoryModel::new(&data_over(source.clone(), 0, 0xff), Codec::Int32);
        let (recorder, sink) = sink();

        model.get_lines(0, 1, &sink);
        source.release();
        recorder.wait_stopped().await;
        assert_eq!(
            *recorder.messages.lock(),
            vec![Some(LoadMessage::Info("before capture start".to_string()))]
        );

        let lines = model.get_lines(0, 1, &sink);
        assert!(lines[0].text.ends_with("????????"));
    }

    #[tokio::test]
    async fn test_line_count_rounds_up_partial_row() {
        let source = Arc::new(MockMemorySource::new(vec![0xee; 20], 0x10));
        let model = MemoryModel::new(&data_over(source, 0x10, 0x10 + 19), Codec::Bytes);
        assert_eq!(model.get_line_count(), 2);

        let lines = model.load_lines(0, 10).await;
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1].text.len(), 83);
        assert!(lines[1].text.starts_with("0000000000000020: ee ee ee ee    "));
        assert!(lines[1].text.ends_with(&format!("....{}", " ".repeat(12))));
    }

    #[tokio::test]
    async fn test_numeric_codecs_round_trip() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&0xbeefu16.to_le_bytes());
        bytes.extend_from_slice(&[0; 14]);
        bytes.extend_from_slice(&0xdeadbeefu32.to_le_bytes());
        bytes.extend_from_slice(&[0; 12]);
        bytes.extend_from_slice(&0x0123456789abcdefu64.to_le_bytes());
        bytes.extend_from_slice(&[0; 8]);
        bytes.extend_from_slice(&(-12.5f32).to_le_bytes());
        bytes.extend_from_slice(&[0; 12]);
        bytes.extend_from_slice(&6.02e23f64.to_le_bytes());
        bytes.extend_from_slice(&[0; 8]);
        bytes.extend_from_slice(&half::f16::from_f32(-0.75).to_bits().to_le_bytes());
        bytes.extend_from_slice(&[0; 14]);
        let len = bytes.len() as u64;

        let source = Arc::new(MockMemorySource::new(bytes, 0));
        let data = data_over(source, 0, len - 1);
        let first_item = |codec: Codec, row: u64| {
            let model = MemoryModel::new(&data, codec);
            async move {
                let lines = model.load_lines(row, row + 1).await;
                lines[0].text[18..].split_whitespace().next().unwrap().to_string()
            }
        };

        assert_eq!(first_item(Codec::Int16, 0).await, "beef");
        assert_eq!(first_item(Codec::Int32, 1).await, "deadbeef");
        assert_eq!(first_item(Codec::Int64, 2).await, "0123456789abcdef");
        assert_eq!(first_item(Codec::Float32, 3).await, "-12.5");
        assert_eq!(first_item(Codec::Float64, 4).await, "6.02E23");
        assert_eq!(first_item(Codec::Float16, 5).await, "-0.75");
    }

    #[tokio::test]
    async fn test_codec_aligns_data_model() {
        let source = Arc::new(MockMemorySource::new(vec![0; 64], 0));
        let data = data_over(source, 0, 63);
        assert_eq!(MemoryModel::new(&data, Codec::Float64).data().alignment(), 8);
        assert_eq!(MemoryModel::new(&data, Codec::Int16).data().alignment(), 2);
    }

    #[tokio::test]
    async fn test_reads_map_to_hex_and_ascii_selections() {
        let source = Arc::new(
            MockMemorySource::new(vec![0; 0x100], 0x1000)
                .with_reads(vec![AddressRange::new(0x1024, 0x1027).unwrap()]),
        );
        let model = MemoryModel::new(&data_over(source, 0x1000, 0x10ff), Codec::Bytes);
        model.load_lines(0, 8).await;

        let reads = model.get_reads(0, 8);
        assert_eq!(reads.len(), 2);
        assert_eq!(reads[0].column.kind, ColumnKind::Hex);
        assert_eq!((reads[0].start_row, reads[0].start_col), (2, 30));
        assert_eq!((reads[0].end_row, reads[0].end_col), (2, 41));
        assert_eq!(reads[1].column.kind, ColumnKind::Ascii);
        assert_eq!((reads[1].start_col, reads[1].end_col), (71, 75));
        assert!(model.get_writes(0, 8).is_empty());
    }

    #[tokio::test]
    async fn test_reads_spanning_rows_end_on_last_row() {
        // Bytes 8..18: the read ends at byte 2 of row 1, left of where it starts
        let source = Arc::new(
            MockMemorySource::new(vec![0; 0x100], 0)
                .with_reads(vec![AddressRange::new(0x08, 0x11).unwrap()]),
        );
        let model = MemoryModel::new(&data_over(source, 0, 0xff), Codec::Bytes);
        model.load_lines(0, 4).await;

        let reads = model.get_reads(0, 4);
        assert_eq!(reads.len(), 2);
        assert_eq!((reads[0].start_row, reads[0].start_col), (0, 42));
        assert_eq!((reads[0].end_row, reads[0].end_col), (1, 23));
        assert_eq!(reads[0].columns_on_row(1), Some((18, 23)));
        assert_eq!((reads[1].start_col, reads[1].end_col), (75, 69));
        assert_eq!(reads[1].columns_on_row(0), Some((75, 83)));
        assert_eq!(reads[1].columns_on_row(1), Some((67, 69)));
    }

    #[tokio::test]
    async fn test_get_lines_with_budget_below_span() {
        let source = Arc::new(MockMemorySource::new(vec![0x41; 2 * 0x10000], 0));
        let config = crate::config::CacheConfig {
            budget_bytes: crate::cache::PAGE_SIZE,
            ..Default::default()
        };
        let data = MemoryDataModel::with_config(
            source.clone(),
            AddressRange::new(0, 2 * 0x10000 - 1).unwrap(),
            Handle::current(),
            &config,
        );
        let model = MemoryModel::new(&data, Codec::Bytes);
        let (recorder, sink) = sink();

        // Rows 4094..4098 straddle the page boundary
        assert!(model.get_lines(4094, 4098, &sink).is_empty());
        recorder.wait_stopped().await;

        for _ in 0..3 {
            assert_eq!(model.get_lines(4094, 4098, &sink).len(), 4);
        }
        assert_eq!(recorder.started.load(Ordering::SeqCst), 1);
        assert_eq!(source.fetch_count(), 2);
    }

    #[tokio::test]
    async fn test_provenance_outside_rows_is_skipped() {
        let source = Arc::new(
            MockMemorySource::new(vec![0; 0x100], 0)
                .with_writes(vec![AddressRange::new(0x80, 0x83).unwrap()]),
        );
        let model = MemoryModel::new(&data_over(source, 0, 0xff), Codec::Bytes);
        model.load_lines(0, 2).await;

        assert!(model.get_writes(0, 2).is_empty());
    }

    #[tokio::test]
    async fn test_highlights_empty_until_loaded() {
        let source = Arc::new(
            MockMemorySource::new(vec![0; 0x100], 0)
                .with_reads(vec![AddressRange::new(0, 3).unwrap()])
                .gated(),
        );
        let model = MemoryModel::new(&data_over(source, 0, 0xff), Codec::Bytes);
        assert!(model.get_reads(0, 1).is_empty());
    }

    #[tokio::test]
    async fn test_selection_symmetry_with_selectable_region() {
        let source = Arc::new(
            MockMemorySource::new(vec![0; 0x100], 0)
                .with_reads(vec![AddressRange::new(0x13, 0x2a).unwrap()]),
        );
        for codec in [Codec::Bytes, Codec::Int32, Codec::Float64] {
            let model = MemoryModel::new(&data_over(source.clone(), 0, 0xff), codec);
            model.load_lines(0, 4).await;

            for selection in model.get_reads(0, 4) {
                for row in selection.start_row..=selection.end_row {
                    let (from, to) = selection.columns_on_row(row).unwrap();
                    for col in from..to {
                        assert_eq!(
                            model.get_selectable_region(col),
                            Some(selection.column),
                            "{:?} col {}",
                            codec,
                            col
                        );
                    }
                }
            }
        }
    }

    #[tokio::test]
    async fn test_copy_single_row_is_exact_text() {
        let source = Arc::new(MockMemorySource::new((0u8..=255).collect(), 0));
        let model = MemoryModel::new(&data_over(source, 0, 0xff), Codec::Bytes);
        let hex = model.columns()[1];

        let selection = Selection::new(hex, (1, 21), (1, 26));
        let copied = model.get_copy_data(&selection).await;
        assert_eq!(copied.len(), 1);
        assert_eq!(copied[0].column, ColumnKind::Hex);
        assert_eq!(copied[0].text, "11 12");
    }

    #[tokio::test]
    async fn test_copy_multi_row_trims_to_group() {
        let source = Arc::new(MockMemorySource::new((0u8..=255).collect(), 0));
        let model = MemoryModel::new(&data_over(source, 0, 0xff), Codec::Bytes);
        let hex = model.columns()[1];

        let selection = Selection::new(hex, (0, 60), (2, 23));
        let copied = model.get_copy_data(&selection).await;
        assert_eq!(
            copied[0].text,
            format!(
                "0e 0f\n{}\n20 21",
                (0x10..0x20)
                    .map(|b| format!("{:02x}", b))
                    .collect::<Vec<_>>()
                    .join(" ")
            )
        );
    }

    #[tokio::test]
    async fn test_copy_ascii_uses_underlying_bytes() {
        let mut bytes = b"hello\nworld\x01!!!!".to_vec();
        bytes.extend_from_slice(b"second row text!");
        let source = Arc::new(MockMemorySource::new(bytes, 0));
        let model = MemoryModel::new(&data_over(source, 0, 31), Codec::Bytes);
        let ascii = model.columns()[2];

        let rendered = model.load_lines(0, 1).await;
        assert!(rendered[0].text.ends_with("hello.world.!!!!"));

        let selection = Selection::new(ascii, (0, ascii.from + 3), (1, ascii.from + 6));
        let copied = model.get_copy_data(&selection).await;
        assert_eq!(copied[0].text, "lo\nworld\u{1}!!!!\nsecond");
    }

    #[tokio::test]
    async fn test_copy_empty_selection() {
        let source = Arc::new(MockMemorySource::new(vec![0; 32], 0));
        let model = MemoryModel::new(&data_over(source, 0, 31), Codec::Bytes);
        let hex = model.columns()[1];

        let selection = Selection::new(hex, (0, 30), (0, 30));
        assert!(model.get_copy_data(&selection).await.is_empty());
    }
}
