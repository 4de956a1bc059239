//! Value helpers

use super::{arg_error, expect_args, NativeResult};
use crate::executor::errors::{self, ErrorInfo};
use crate::executor::types::Val;

/// len(value) - Length of a list, string or object
pub fn len(args: &[Val]) -> NativeResult {
    expect_args("len", args, 1)?;
    let n = match &args[0] {
        Val::List(items) => items.len(),
        Val::Str(s) => s.chars().count(),
        Val::Obj(map) => map.len(),
        other => {
            return Err(arg_error(
                errors::WRONG_ARG_TYPE,
                format!("len is not defined for {}", other.type_name()),
            ))
        }
    };
    Ok(Val::Num(n as f64))
}

/// keys(value) - Keys a for-in loop would visit
pub fn keys(args: &[Val]) -> NativeResult {
    expect_args("keys", args, 1)?;
    Ok(Val::List(args[0].enumerate_keys().map(Val::Str).collect()))
}

/// Error(message, code?) - Build an error value
pub fn error(args: &[Val]) -> NativeResult {
    let message = args.first().map(Val::display).unwrap_or_default();
    let code = match args.get(1) {
        Some(Val::Str(code)) => code.clone(),
        _ => errors::USER_ERROR.to_string(),
    };
    Ok(Val::Error(ErrorInfo::new(code, message)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::indexmap;

    #[test]
    fn test_len() {
        assert_eq!(len(&[Val::str("héllo")]), Ok(Val::Num(5.0)));
        assert_eq!(len(&[Val::List(vec![Val::Null; 3])]), Ok(Val::Num(3.0)));
        assert!(len(&[Val::Null]).is_err());
        assert!(len(&[]).is_err());
    }

    #[test]
    fn test_keys_of_object_follow_insertion_order() {
        let obj = Val::Obj(indexmap! {
            "b".to_string() => Val::Num(2.0),
            "a".to_string() => Val::Num(1.0),
        });
        assert_eq!(
            keys(&[obj]),
            Ok(Val::List(vec![Val::str("b"), Val::str("a")]))
        );
    }

    #[test]
    fn test_error_defaults_to_user_error() {
        let Ok(Val::Error(err)) = error(&[Val::str("boom")]) else {
            unreachable!("Expected an error value");
        };
        assert_eq!(err.code, errors::USER_ERROR);
        assert_eq!(err.message, "boom");
        assert_eq!(err.id, None);
    }
}
