pub(crate) mod ranking;
pub(crate) mod roster_import;
pub(crate) mod spreadsheet;
