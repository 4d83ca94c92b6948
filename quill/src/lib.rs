//! Quill, a small sandboxed scripting language for chart snippets
mod compile;
mod error;
mod lex;
mod parse;

pub mod ast;
pub mod builtin;
pub mod env;
pub mod interp;
pub mod promise;
pub mod types;

pub use compile::compile;
pub use compile::Invokable;
pub use env::Env;
pub use env::EnvRef;
pub use error::Error;
pub use interp::message_of;
pub use interp::Interp;
pub use parse::parse;
pub use parse::parse_expr;
pub use promise::Promise;
pub use promise::Settled;
pub use types::arg;
pub use types::fmt_num;
pub use types::ArrayRef;
pub use types::BoundMethod;
pub use types::Closure;
pub use types::ErrorObj;
pub use types::Extern;
pub use types::NativeFn;
pub use types::ObjectRef;
pub use types::Val;

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
impl Extern for void::Void {
    fn type_name(&self) -> &'static str {
        void::unreachable(*self)
    }
}
