//! Workbook model - high-level API for XLSX workbooks

mod cell;
mod cell_ref;
mod comments;
mod drawing;
mod named_range;
mod shared_strings;
mod sheet;
mod styles;
mod table;
mod workbook;
mod worksheet;

pub use cell::{format_number, Cell, CellKind, CellType, CellValue, Formula, Row};
pub use cell_ref::{column_index, column_name, CellRange, CellRef, MAX_COLUMNS, MAX_ROWS};
pub use comments::SheetComment;
pub use drawing::SheetDrawing;
pub use named_range::NamedRange;
pub use shared_strings::SharedStrings;
pub use sheet::{Sheet, SheetMut, SheetState};
pub use styles::{BorderStyle, CellStyle, HorizontalAlignment, Stylesheet, VerticalAlignment};
pub use table::{Table, TableMut, TableView};
pub use workbook::Workbook;
pub use worksheet::WorksheetPart;
