//! Output functions

use super::NativeResult;
use crate::executor::types::Val;
use std::cell::RefCell;
use tracing::info;

/// print(...values) - Write the values, space separated, as one line
pub fn print(args: &[Val], output: &RefCell<Vec<String>>) -> NativeResult {
    let line = args.iter().map(Val::display).collect::<Vec<_>>().join(" ");
    info!(target: "strata::print", "{}", line);
    output.borrow_mut().push(line);
    Ok(Val::Null)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_print_joins_arguments() {
        let output = RefCell::new(Vec::new());
        let result = print(&[Val::str("a"), Val::Num(1.0), Val::Bool(true)], &output);
        assert_eq!(result, Ok(Val::Null));
        assert_eq!(output.into_inner(), vec!["a 1 true".to_string()]);
    }
}
