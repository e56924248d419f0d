//! Precise mark-sweep heap.
//!
//! Every heap object kind lives in its own [`arena::Arena`], a split-by-kind
//! layout with no generational or incremental machinery: this collector is
//! a plain stop-the-world mark-sweep, triggered by a self-adjusting byte
//! threshold (`next_gc`, growing by `GROW_FACTOR` after each cycle).

mod arena;
pub mod object;

use arena::Arena;
use object::{Closure, LoxFunction, LoxString, Native, NativeFn, Upvalue};

use crate::table::{fnv1a_hash, InternTable};
use crate::value::{ClosureId, FunctionId, GcRef, NativeId, StringId, UpvalueId, Value};

/// Heap grows by this factor of its live size before the next collection is
/// triggered.
const GROW_FACTOR: usize = 2;
const INITIAL_NEXT_GC: usize = 1024 * 1024;

enum GrayItem {
    Ref(GcRef),
    Upvalue(UpvalueId),
}

pub struct Gc {
    strings: Arena<LoxString>,
    functions: Arena<LoxFunction>,
    closures: Arena<Closure>,
    natives: Arena<Native>,
    upvalues: Arena<Upvalue>,
    intern: InternTable,
    gray: Vec<GrayItem>,
    bytes_allocated: usize,
    next_gc: usize,
    /// When set, [`Gc::should_collect`] always reports `true`, so a
    /// collection runs on every single allocation growth point instead of
    /// only once the heap crosses `next_gc`. This is the deterministic
    /// `stress_gc` mode soundness tests run under.
    stress_gc: bool,
}

impl Default for Gc {
    fn default() -> Self {
        Gc::new()
    }
}

impl Gc {
    pub fn new() -> Self {
        Gc {
            strings: Arena::new(),
            functions: Arena::new(),
            closures: Arena::new(),
            natives: Arena::new(),
            upvalues: Arena::new(),
            intern: InternTable::new(),
            gray: Vec::new(),
            bytes_allocated: 0,
            next_gc: INITIAL_NEXT_GC,
            stress_gc: false,
        }
    }

    /// Force a collection at every growth point regardless of `next_gc`,
    /// for deterministic GC tests.
    pub fn set_stress_gc(&mut self, enabled: bool) {
        self.stress_gc = enabled;
    }

    pub fn bytes_allocated(&self) -> usize {
        self.bytes_allocated
    }

    pub fn should_collect(&self) -> bool {
        self.stress_gc || self.bytes_allocated > self.next_gc
    }

    // ----- allocation -----------------------------------------------------

    /// Intern `text`: returns the existing id if an equal string is already
    /// on the heap, otherwise allocates a new one. This is the only way
    /// strings enter the heap, so string equality can always reduce to id
    /// equality.
    pub fn intern(&mut self, text: &str) -> StringId {
        let hash = fnv1a_hash(text.as_bytes());
        if let Some(id) = self.intern.find(text, hash) {
            return id;
        }
        let index = self.strings.alloc(LoxString {
            text: text.into(),
            hash,
        });
        self.bytes_allocated += text.len() + std::mem::size_of::<LoxString>();
        let id = StringId(index);
        self.intern.insert(text.into(), hash, id);
        id
    }

    pub fn alloc_function(&mut self, function: LoxFunction) -> FunctionId {
        self.bytes_allocated += std::mem::size_of::<LoxFunction>();
        FunctionId(self.functions.alloc(function))
    }

    pub fn alloc_closure(&mut self, function: FunctionId, upvalues: Vec<UpvalueId>) -> ClosureId {
        self.bytes_allocated += std::mem::size_of::<Closure>();
        ClosureId(self.closures.alloc(Closure { function, upvalues }))
    }

    pub fn alloc_native(&mut self, name: &'static str, arity: Option<u8>, function: NativeFn) -> NativeId {
        self.bytes_allocated += std::mem::size_of::<Native>();
        NativeId(self.natives.alloc(Native { name, arity, function }))
    }

    pub fn alloc_upvalue(&mut self, stack_index: usize) -> UpvalueId {
        self.bytes_allocated += std::mem::size_of::<Upvalue>();
        UpvalueId(self.upvalues.alloc(Upvalue::Open(stack_index)))
    }

    // ----- accessors --------------------------------------------------

    pub fn string(&self, id: StringId) -> &str {
        &self.strings.get(id.0).text
    }

    pub fn function(&self, id: FunctionId) -> &LoxFunction {
        self.functions.get(id.0)
    }

    pub fn function_mut(&mut self, id: FunctionId) -> &mut LoxFunction {
        self.functions.get_mut(id.0)
    }

    pub fn closure(&self, id: ClosureId) -> &Closure {
        self.closures.get(id.0)
    }

    pub fn native(&self, id: NativeId) -> &Native {
        self.natives.get(id.0)
    }

    pub fn upvalue(&self, id: UpvalueId) -> &Upvalue {
        self.upvalues.get(id.0)
    }

    pub fn upvalue_mut(&mut self, id: UpvalueId) -> &mut Upvalue {
        self.upvalues.get_mut(id.0)
    }

    pub fn close_upvalue(&mut self, id: UpvalueId, value: Value) {
        *self.upvalues.get_mut(id.0) = Upvalue::Closed(value);
    }

    /// Render a value that may require a heap lookup (strings print their
    /// contents, functions their name) the way `print` and runtime-error
    /// messages need.
    pub fn display_value(&self, value: &Value) -> String {
        match value {
            Value::Object(GcRef::String(id)) => self.string(*id).to_string(),
            Value::Object(GcRef::Function(id)) => match self.function(*id).name {
                Some(name) => format!("<fn {}>", self.string(name)),
                None => "<script>".to_string(),
            },
            Value::Object(GcRef::Closure(id)) => {
                let function = self.closure(*id).function;
                match self.function(function).name {
                    Some(name) => format!("<fn {}>", self.string(name)),
                    None => "<script>".to_string(),
                }
            }
            Value::Object(GcRef::Native(id)) => format!("<native fn {}>", self.native(*id).name),
            other => other.to_string(),
        }
    }

    // ----- mark-sweep -------------------------------------------------

    fn mark_value(&mut self, value: Value) {
        if let Value::Object(r) = value {
            self.mark_ref(r);
        }
    }

    fn mark_ref(&mut self, r: GcRef) {
        let newly_marked = match r {
            GcRef::String(id) => self.strings.mark(id.0),
            GcRef::Function(id) => self.functions.mark(id.0),
            GcRef::Closure(id) => self.closures.mark(id.0),
            GcRef::Native(id) => self.natives.mark(id.0),
        };
        if newly_marked {
            self.gray.push(GrayItem::Ref(r));
        }
    }

    fn mark_upvalue_id(&mut self, id: UpvalueId) {
        if self.upvalues.mark(id.0) {
            self.gray.push(GrayItem::Upvalue(id));
        }
    }

    /// Walk one gray item's children, turning it black. Strings and natives
    /// have no outgoing references so they're already leaves.
    fn blacken(&mut self, item: GrayItem) {
        match item {
            GrayItem::Ref(GcRef::Function(id)) => {
                let constants: Vec<Value> = self.functions.get(id.0).chunk.constants.clone();
                let name = self.functions.get(id.0).name;
                if let Some(name) = name {
                    self.mark_ref(GcRef::String(name));
                }
                for constant in constants {
                    self.mark_value(constant);
                }
            }
            GrayItem::Ref(GcRef::Closure(id)) => {
                let function = self.closures.get(id.0).function;
                let upvalues = self.closures.get(id.0).upvalues.clone();
                self.mark_ref(GcRef::Function(function));
                for upvalue in upvalues {
                    self.mark_upvalue_id(upvalue);
                }
            }
            GrayItem::Upvalue(id) => {
                if let Upvalue::Closed(value) = *self.upvalues.get(id.0) {
                    self.mark_value(value);
                }
            }
            GrayItem::Ref(GcRef::String(_)) | GrayItem::Ref(GcRef::Native(_)) => {}
        }
    }

    /// Run one full mark-sweep cycle. `roots` yields every value directly
    /// reachable from the VM (stack, globals, call-frame closures); `open_upvalues`
    /// yields every upvalue currently open on the VM's linked list. Both are
    /// collected eagerly by the caller, since `Gc` cannot safely borrow the
    /// VM's own stack while also mutating its own arenas.
    pub fn collect(&mut self, roots: Vec<Value>, open_upvalues: Vec<UpvalueId>) {
        for value in roots {
            self.mark_value(value);
        }
        for id in open_upvalues {
            self.mark_upvalue_id(id);
        }

        while let Some(item) = self.gray.pop() {
            self.blacken(item);
        }

        self.strings.sweep();
        self.functions.sweep();
        self.closures.sweep();
        self.natives.sweep();
        self.upvalues.sweep();

        let strings = &self.strings;
        self.intern.retain_live(|id| strings.is_live(id.0));

        self.bytes_allocated = self.estimate_live_bytes();
        self.next_gc = self.bytes_allocated.max(INITIAL_NEXT_GC) * GROW_FACTOR;
    }

    fn estimate_live_bytes(&self) -> usize {
        let strings: usize = self
            .strings
            .iter_live()
            .map(|(_, s)| s.text.len() + std::mem::size_of::<LoxString>())
            .sum();
        let functions = self.functions.iter_live().count() * std::mem::size_of::<LoxFunction>();
        let closures = self.closures.iter_live().count() * std::mem::size_of::<Closure>();
        let natives = self.natives.iter_live().count() * std::mem::size_of::<Native>();
        let upvalues = self.upvalues.iter_live().count() * std::mem::size_of::<Upvalue>();
        strings + functions + closures + natives + upvalues
    }
}
