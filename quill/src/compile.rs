//! Compile snippet text into a unit that can be invoked with positional arguments
use crate::ast::Stmt;
use crate::{parse, Extern, Interp, Result, Val};
use std::sync::Arc;
use tracing::debug;

/// A parsed function body with named positional parameters
#[derive(Debug, Clone, PartialEq)]
pub struct Invokable {
    params: Vec<String>,
    body: Arc<Vec<Stmt>>,
}

/// Compile text as the body of a function taking `params`
pub fn compile(text: &str, params: &[&str]) -> Result<Invokable> {
    let body = parse(text)?;
    debug!("compiled {} statements", body.len());
    Ok(Invokable {
        params: params.iter().map(|p| p.to_string()).collect(),
        body: Arc::new(body),
    })
}

impl Invokable {
    pub fn params(&self) -> &[String] {
        &self.params
    }

    /// Invoke with positional arguments in a fresh scope, returning the body's return value.
    ///
    /// Parameters are bound in an outer scope so declarations in the body may shadow them.
    /// Promise reactions scheduled during invocation remain queued on `interp`.
    pub fn invoke<T: Extern>(&self, interp: &mut Interp<T>, args: Vec<Val<T>>) -> Result<Val<T>> {
        interp.run_body(&self.params, &self.body, args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use assert_matches::assert_matches;
    use void::Void;

    type Interp = crate::Interp<Void>;
    type Val = crate::Val<Void>;

    #[test]
    fn invoke_with_params() {
        let f = compile("return a * b", &["a", "b"]).unwrap();
        assert_eq!(f.params(), &["a".to_string(), "b".to_string()]);
        let mut interp = Interp::new();
        assert_eq!(
            f.invoke(&mut interp, vec![Val::Num(6.0), Val::Num(7.0)]),
            Ok(Val::Num(42.0))
        );
    }

    #[test]
    fn missing_args_are_undefined() {
        let f = compile("return typeof b", &["a", "b"]).unwrap();
        let mut interp = Interp::new();
        assert_eq!(
            f.invoke(&mut interp, vec![Val::Num(1.0)]),
            Ok(Val::string("undefined"))
        );
    }

    #[test]
    fn body_may_shadow_param() {
        let f = compile("const width = 10; return width", &["width"]).unwrap();
        let mut interp = Interp::new();
        assert_eq!(
            f.invoke(&mut interp, vec![Val::Num(888.0)]),
            Ok(Val::Num(10.0))
        );
    }

    #[test]
    fn runs_do_not_leak() {
        let mut interp = Interp::new();
        let first = compile("var leaked = 1; return leaked", &[]).unwrap();
        assert_eq!(first.invoke(&mut interp, vec![]), Ok(Val::Num(1.0)));
        let second = compile("return leaked", &[]).unwrap();
        assert_eq!(
            second.invoke(&mut interp, vec![]),
            Err(Error::Undefined("leaked".to_string()))
        );
    }

    #[test]
    fn syntax_error() {
        assert_matches!(compile("return (", &[]), Err(Error::Syntax(_)));
    }
}
