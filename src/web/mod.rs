pub mod appeals;
pub mod files;
pub mod intake;
pub mod statistics;

use actix_multipart::Field;
use actix_web::error;
use chrono::NaiveDateTime;
use futures_util::TryStreamExt;

/// Configures the web app by adding services from each web file.
///
/// @see https://docs.rs/actix-web/4.0.1/actix_web/struct.App.html#method.configure
pub fn configure(conf: &mut actix_web::web::ServiceConfig) {
    // Descending order. Order is important.
    // Route resolution will stop at the first match.
    appeals::configure(conf);
    files::configure(conf);
    intake::configure(conf);
    statistics::configure(conf);
}

/// Read one multipart field into memory, rejecting fields over `max_bytes`.
pub(crate) async fn read_field_bytes(
    field: &mut Field,
    max_bytes: usize,
) -> Result<Vec<u8>, actix_web::Error> {
    let mut data = Vec::new();

    while let Some(chunk) = field.try_next().await? {
        if data.len() + chunk.len() > max_bytes {
            return Err(error::ErrorBadRequest(format!(
                "File exceeds the {} MB upload limit",
                max_bytes / (1024 * 1024)
            )));
        }
        data.extend_from_slice(&chunk);
    }

    Ok(data)
}

/// Read one multipart field as UTF-8 text.
pub(crate) async fn read_field_text(field: &mut Field) -> Result<String, actix_web::Error> {
    // Text fields are small; cap them well below the file limit.
    let data = read_field_bytes(field, 64 * 1024).await?;
    String::from_utf8(data).map_err(|_| error::ErrorBadRequest("Field is not valid UTF-8"))
}

/// Parse the date formats the staff frontend sends (`31.12.2024` or
/// `31.12.24`), as the start of that day.
pub(crate) fn parse_date_param(value: &str) -> Result<NaiveDateTime, actix_web::Error> {
    use chrono::NaiveDate;

    for format in ["%d.%m.%Y", "%d.%m.%y"] {
        if let Ok(date) = NaiveDate::parse_from_str(value, format) {
            if let Some(datetime) = date.and_hms_opt(0, 0, 0) {
                return Ok(datetime);
            }
        }
    }

    Err(error::ErrorBadRequest(format!(
        "Unrecognized date: {}",
        value
    )))
}

/// End of the day a date parameter names.
pub(crate) fn end_of_day(start: NaiveDateTime) -> NaiveDateTime {
    start.date().and_hms_opt(23, 59, 59).unwrap_or(start)
}
