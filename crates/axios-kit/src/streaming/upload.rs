//! Multipart upload bodies.

use serde_json::Value;

use crate::http::{FilePart, MultipartForm};
use crate::logging::targets;
use crate::params::scalar_to_string;

/// Places upload files into the form.
///
/// Implemented for any `Fn(&mut MultipartForm, &[FilePart])`:
///
/// ```ignore
/// // "files[0]", "files[1]", ... in reverse input order
/// descriptor.sequence(|form: &mut MultipartForm, files: &[FilePart]| {
///     for (i, file) in files.iter().rev().enumerate() {
///         form.append_file(format!("files[{i}]"), file.clone());
///     }
/// });
/// ```
pub trait FormSequencer: Send + Sync {
    /// Append `files` to `form` in whatever order and under whatever names.
    fn sequence(&self, form: &mut MultipartForm, files: &[FilePart]);
}

impl<F> FormSequencer for F
where
    F: Fn(&mut MultipartForm, &[FilePart]) + Send + Sync,
{
    fn sequence(&self, form: &mut MultipartForm, files: &[FilePart]) {
        self(form, files)
    }
}

/// Build the multipart body of an upload.
///
/// Files go through `sequencer` when one is given, otherwise each is
/// appended under `file_field` in input order. The top-level fields of an
/// object-shaped `data` follow as text parts.
pub fn build_upload_form(
    files: &[FilePart],
    file_field: &str,
    data: Option<&Value>,
    sequencer: Option<&dyn FormSequencer>,
) -> MultipartForm {
    let mut form = MultipartForm::new();
    match sequencer {
        Some(sequencer) => sequencer.sequence(&mut form, files),
        None => {
            for file in files {
                form.append_file(file_field, file.clone());
            }
        }
    }

    match data {
        Some(Value::Object(fields)) => {
            for (name, value) in fields {
                append_field(&mut form, name, value);
            }
        }
        Some(Value::Null) | None => {}
        Some(other) => {
            tracing::debug!(target: targets::STREAMING, "ignoring non-object upload data: {other}");
        }
    }

    tracing::debug!(
        target: targets::STREAMING,
        parts = form.len(),
        file_bytes = form.file_bytes(),
        "upload form built"
    );
    form
}

fn append_field(form: &mut MultipartForm, name: &str, value: &Value) {
    match value {
        Value::Null => {}
        Value::Array(items) => {
            for item in items {
                append_field(form, name, item);
            }
        }
        Value::Object(_) => form.append_text(name, value.to_string()),
        scalar => form.append_text(name, scalar_to_string(scalar)),
    }
}
