/// Errors returned by the card localizer.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum LocateError {
    #[error("image has no pixels (width={width}, height={height})")]
    EmptyImage { width: u32, height: u32 },
    #[error("reference corner layout is degenerate and cannot be rectified")]
    DegenerateReference,
}
