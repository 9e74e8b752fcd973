use super::source::{Bucket, Snapshot};

pub(crate) const CELL_WIDTH: usize = 6;
const MIN_COLUMNS: usize = 8;
const MAX_COLUMNS: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CellKind {
    Empty,
    Chain,
    Occupied,
    Deleted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct CellView {
    pub(crate) kind: CellKind,
    pub(crate) label: String,
}

pub(crate) fn cell_view(bucket: &Bucket) -> CellView {
    let (kind, label) = match bucket {
        Bucket::Empty => (CellKind::Empty, String::new()),
        Bucket::Chain(entries) => (CellKind::Chain, entries.join(",")),
        Bucket::Occupied(value) => (CellKind::Occupied, value.clone()),
        Bucket::Tombstone => (CellKind::Deleted, "DEL".to_string()),
    };
    CellView { kind, label }
}

pub(crate) fn grid_columns(bucket_count: usize) -> usize {
    let root = (bucket_count as f64).sqrt().ceil() as usize;
    root.clamp(MIN_COLUMNS, MAX_COLUMNS)
}

// Columns that actually fit in `width` terminal cells, never below one.
pub(crate) fn fitted_columns(bucket_count: usize, width: usize) -> usize {
    grid_columns(bucket_count).min(width / CELL_WIDTH).max(1)
}

pub(crate) fn cell_text(view: &CellView) -> String {
    format!("{} ", cell_label(view))
}

// Label centred in the cell, without the trailing gap column.
pub(crate) fn cell_label(view: &CellView) -> String {
    let inner = CELL_WIDTH - 1;
    let label = if view.label.chars().count() > inner {
        let mut cut = view
            .label
            .chars()
            .take(inner.saturating_sub(1))
            .collect::<String>();
        cut.push('…');
        cut
    } else {
        view.label.clone()
    };
    format!("{label:^inner$}")
}

pub(crate) fn grid_rows(snapshot: &Snapshot, columns: usize) -> Vec<Vec<CellView>> {
    snapshot
        .buckets
        .chunks(columns.max(1))
        .map(|row| row.iter().map(cell_view).collect())
        .collect()
}

pub(crate) fn text_grid(snapshot: &Snapshot, width: usize) -> String {
    let columns = fitted_columns(snapshot.buckets.len(), width);
    grid_rows(snapshot, columns)
        .iter()
        .map(|row| {
            row.iter()
                .map(|view| match view.kind {
                    CellKind::Empty => format!("{:^w$} ", "·", w = CELL_WIDTH - 1),
                    _ => cell_text(view),
                })
                .collect::<String>()
                .trim_end()
                .to_string()
        })
        .collect::<Vec<_>>()
        .join("\n")
}
