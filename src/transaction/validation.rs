//! Validation of transaction input shared by the JSON API and the create
//! dialog form.
//!
//! The rules mirror the client-side schema: concepto between 3 and 100
//! characters, monto non-zero, fecha a valid calendar date. The validation
//! messages are surfaced to clients verbatim.

use time::{Date, format_description::BorrowedFormatItem, macros::format_description};

use crate::Error;

/// The minimum number of characters for a concepto.
pub const CONCEPTO_MIN_CHARS: usize = 3;
/// The maximum number of characters for a concepto.
pub const CONCEPTO_MAX_CHARS: usize = 100;

/// The wire format for fecha values, e.g. "2024-01-15".
pub(crate) const FECHA_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day]");

/// Check a transaction payload before it reaches the store.
///
/// `None` fields mean the client omitted them; an omission is reported as a
/// missing-fields error before any per-field rule runs, matching the
/// behaviour clients already rely on.
///
/// # Errors
///
/// Returns:
/// - [Error::MissingFields] if any field is absent or blank,
/// - [Error::Validation] with a client-facing message if a field is present
///   but malformed (concepto length, zero monto, unparseable fecha).
pub fn validate_new_transaction(
    concepto: Option<&str>,
    monto: Option<f64>,
    fecha: Option<&str>,
) -> Result<(String, f64, Date), Error> {
    let concepto = match concepto {
        Some(concepto) if !concepto.trim().is_empty() => concepto.trim(),
        _ => return Err(Error::MissingFields),
    };
    let monto = monto.ok_or(Error::MissingFields)?;
    let fecha = match fecha {
        Some(fecha) if !fecha.trim().is_empty() => fecha.trim(),
        _ => return Err(Error::MissingFields),
    };

    let concepto_chars = concepto.chars().count();
    if concepto_chars < CONCEPTO_MIN_CHARS {
        return Err(Error::Validation(
            "El concepto debe tener al menos 3 caracteres".to_owned(),
        ));
    }
    if concepto_chars > CONCEPTO_MAX_CHARS {
        return Err(Error::Validation(
            "El concepto no puede tener más de 100 caracteres".to_owned(),
        ));
    }

    if monto == 0.0 {
        return Err(Error::Validation("El monto no puede ser cero".to_owned()));
    }

    let fecha = Date::parse(fecha, FECHA_FORMAT)
        .map_err(|_| Error::Validation("La fecha debe ser válida".to_owned()))?;

    Ok((concepto.to_owned(), monto, fecha))
}
