//! Bind sea-query values to sqlx arguments.

use anyhow::anyhow;
use sea_query::{Value, Values};
use sqlx::Arguments;
use sqlx::postgres::PgArguments;

use crate::error::{AppError, AppResult};

/// Convert collected statement values into positional Postgres arguments.
///
/// Only the value kinds the report query builder produces are supported;
/// anything else is an internal error rather than a silent mis-bind.
pub fn bind_values(values: &Values) -> AppResult<PgArguments> {
    let mut args = PgArguments::default();
    for value in &values.0 {
        bind_value(&mut args, value)?;
    }
    Ok(args)
}

fn bind_value(args: &mut PgArguments, value: &Value) -> AppResult<()> {
    let result = match value {
        Value::Bool(v) => args.add(*v),
        Value::Int(v) => args.add(*v),
        Value::BigInt(v) => args.add(*v),
        Value::BigUnsigned(v) => {
            let converted = v
                .map(i64::try_from)
                .transpose()
                .map_err(|_| anyhow!("unsigned parameter out of range for int8"))?;
            args.add(converted)
        }
        Value::Float(v) => args.add(*v),
        Value::Double(v) => args.add(*v),
        Value::String(v) => args.add(v.as_deref().cloned()),
        Value::ChronoDateTimeUtc(v) => args.add(v.as_deref().copied()),
        other => {
            return Err(AppError::Internal(anyhow!(
                "unsupported query parameter type: {other:?}"
            )));
        }
    };
    result.map_err(|e| AppError::Internal(anyhow!("failed to bind query parameter: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn supported_values_bind() {
        let values = Values(vec![
            Value::String(Some(Box::new("%garden%".to_string()))),
            Value::Double(Some(75.0)),
            Value::BigInt(Some(80)),
            Value::BigUnsigned(Some(20)),
            Value::ChronoDateTimeUtc(Some(Box::new(Utc::now()))),
            Value::String(None),
        ]);
        let args = bind_values(&values).unwrap();
        assert_eq!(args.len(), 6);
    }

    #[test]
    fn oversized_unsigned_rejected() {
        let values = Values(vec![Value::BigUnsigned(Some(u64::MAX))]);
        assert!(matches!(bind_values(&values), Err(AppError::Internal(_))));
    }

    #[test]
    fn unsupported_value_rejected() {
        let values = Values(vec![Value::Bytes(Some(Box::new(vec![1, 2, 3])))]);
        assert!(matches!(bind_values(&values), Err(AppError::Internal(_))));
    }
}
