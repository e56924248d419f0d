//! Heap object bodies. Each type here lives in its own arena inside [`super::Gc`];
//! a `Value`/`GcRef` never holds one of these directly, only the arena index.

use crate::chunk::Chunk;
use crate::value::{StringId, UpvalueId, Value};

/// An interned string's backing storage: owned text plus its precomputed
/// FNV-1a hash, so the intern table and equality checks never rehash.
pub struct LoxString {
    pub text: Box<str>,
    pub hash: u32,
}

/// A compiled function body. `name` is `None` for the implicit top-level
/// script function.
pub struct LoxFunction {
    pub name: Option<StringId>,
    pub arity: u8,
    pub upvalue_count: u8,
    pub chunk: Chunk,
}

impl LoxFunction {
    pub fn new() -> Self {
        LoxFunction {
            name: None,
            arity: 0,
            upvalue_count: 0,
            chunk: Chunk::new(),
        }
    }
}

impl Default for LoxFunction {
    fn default() -> Self {
        LoxFunction::new()
    }
}

/// A runtime closure: the function it wraps plus the upvalues it captured at
/// creation time.
pub struct Closure {
    pub function: crate::value::FunctionId,
    pub upvalues: Vec<UpvalueId>,
}

/// An upvalue is either still pointing at a live stack slot ("open") or has
/// had its value copied out when that slot's frame returned ("closed"),
/// matching clox's open/closed upvalue split.
pub enum Upvalue {
    Open(usize),
    Closed(Value),
}

pub type NativeFn = fn(&[Value]) -> Result<Value, String>;

/// A host-provided function exposed to Lox code. `arity` of `None` means
/// "accepts any argument count".
pub struct Native {
    pub name: &'static str,
    pub arity: Option<u8>,
    pub function: NativeFn,
}
