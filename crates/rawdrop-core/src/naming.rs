//! Upload filtering and output file names.

use crate::config::OutputFormat;

/// Extension accepted for uploads, compared case-insensitively.
pub const RAW_EXTENSION: &str = "arw";

/// Split `name` into stem and extension at the last dot.
///
/// A leading dot (".hidden") or a trailing dot ("name.") does not count as
/// an extension separator.
fn split_extension(name: &str) -> (&str, Option<&str>) {
    match name.rfind('.') {
        Some(pos) if pos > 0 && pos + 1 < name.len() => (&name[..pos], Some(&name[pos + 1..])),
        _ => (name, None),
    }
}

/// Whether an uploaded file name carries the accepted RAW extension.
pub fn accepts_upload(name: &str) -> bool {
    matches!(
        split_extension(base_name(name)).1,
        Some(ext) if ext.eq_ignore_ascii_case(RAW_EXTENSION)
    )
}

/// Map an upload name to its converted name.
///
/// The final extension is removed exactly once and replaced with the
/// format's extension; a name without one simply gains it.
///
/// # Example
/// ```
/// use rawdrop_core::{output_file_name, OutputFormat};
///
/// assert_eq!(output_file_name("DSC001.ARW", OutputFormat::Jpeg), "DSC001.jpg");
/// assert_eq!(output_file_name("a.b.arw", OutputFormat::Png), "a.b.png");
/// ```
pub fn output_file_name(name: &str, format: OutputFormat) -> String {
    let (stem, _) = split_extension(base_name(name));
    format!("{}.{}", stem, format.extension())
}

/// Drop any directory components a browser or zip tool may have added.
fn base_name(name: &str) -> &str {
    name.rsplit(['/', '\\']).next().unwrap_or(name)
}
