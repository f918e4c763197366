//! Arena-backed object heap: the prototype graph.
//!
//! Objects are records addressed by stable [`ObjRef`] handles; mimic
//! lists hold shared handles, so diamond and cyclic graph shapes are
//! ordinary and never special-cased. Objects live as long as the heap —
//! reclamation is delegated to the host, which here means the arena.

use crate::callable::Callable;
use rustc_hash::{FxHashMap, FxHashSet};
use seren_types::Message;

/// Stable handle to an object in the heap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjRef(u32);

impl ObjRef {
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

/// One object: kind label, owned cells, ordered mimic list, payload.
///
/// Cells and the mimic list are exclusively owned by the object; mimics
/// are non-owning references into the shared graph.
#[derive(Debug, Clone, Default)]
pub struct Object {
    pub kind: Option<String>,
    pub cells: FxHashMap<String, ObjRef>,
    pub mimics: Vec<ObjRef>,
    pub payload: Payload,
    pub documentation: Option<String>,
}

impl Object {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_kind(kind: impl Into<String>) -> Self {
        Self {
            kind: Some(kind.into()),
            ..Self::default()
        }
    }
}

/// Closed polymorphic payload capsule.
///
/// Checked by pattern matching, never by runtime type inspection. The
/// variants cover exactly the capability set the core consumes.
#[derive(Debug, Clone, Default)]
pub enum Payload {
    #[default]
    None,
    Nil,
    Boolean(bool),
    Number(i64),
    Text(String),
    List(Vec<ObjRef>),
    Callable(Callable),
    Context(Context),
    Message(Message),
    Call(CallInfo),
}

/// Scoping pair for one activation.
///
/// Unqualified reads resolve through `ground`; `real_context` is the
/// receiver behind the context wrapper; `enclosing` links a lexical
/// block's activation to its definition site.
#[derive(Debug, Clone)]
pub struct Context {
    pub ground: ObjRef,
    pub real_context: ObjRef,
    pub enclosing: Option<ObjRef>,
}

/// Reified activation handed to macro bodies as the `call` cell: the
/// unevaluated activating message, the caller's context, the receiver.
#[derive(Debug, Clone)]
pub struct CallInfo {
    pub message: Message,
    pub caller: ObjRef,
    pub receiver: ObjRef,
}

/// The arena every object lives in.
#[derive(Debug, Default)]
pub struct Heap {
    objects: Vec<Object>,
}

impl Heap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc(&mut self, object: Object) -> ObjRef {
        let r = ObjRef(self.objects.len() as u32);
        self.objects.push(object);
        r
    }

    pub fn get(&self, r: ObjRef) -> &Object {
        &self.objects[r.index()]
    }

    pub fn get_mut(&mut self, r: ObjRef) -> &mut Object {
        &mut self.objects[r.index()]
    }

    /// First-match-wins cell lookup over the mimic graph.
    ///
    /// Own cells first, then mimics depth-first in registration order,
    /// skipping any object already visited in this call. The visited set
    /// guarantees termination on cyclic and diamond graphs and makes the
    /// winning match deterministic regardless of graph shape. The work
    /// stack is explicit to bound call depth on adversarial graphs.
    pub fn resolve(&self, from: ObjRef, name: &str) -> Option<ObjRef> {
        let mut visited = FxHashSet::default();
        let mut work = vec![from];
        while let Some(cur) = work.pop() {
            if !visited.insert(cur) {
                continue;
            }
            let obj = self.get(cur);
            if let Some(&value) = obj.cells.get(name) {
                return Some(value);
            }
            for &mimic in obj.mimics.iter().rev() {
                work.push(mimic);
            }
        }
        None
    }

    /// Write a cell on `on`'s own store. This never touches a mimic:
    /// assignment is always local to the receiver.
    pub fn set_cell(&mut self, on: ObjRef, name: &str, value: ObjRef) {
        self.get_mut(on).cells.insert(name.to_string(), value);
    }

    /// Prototype-clone ("mimicking"): a fresh object whose single mimic
    /// is the source, with an independently owned, empty cell store. The
    /// payload is cloned by its own rule — a list payload gets a new
    /// backing vector so the clone never aliases the source's storage.
    /// Documentation is inherited at mimic time.
    pub fn mimic(&mut self, source: ObjRef) -> ObjRef {
        let src = self.get(source);
        let object = Object {
            kind: None,
            cells: FxHashMap::default(),
            mimics: vec![source],
            payload: src.payload.clone(),
            documentation: src.documentation.clone(),
        };
        self.alloc(object)
    }

    /// The nearest kind label up the mimic graph, in resolution order.
    pub fn kind_name(&self, of: ObjRef) -> &str {
        let mut visited = FxHashSet::default();
        let mut work = vec![of];
        while let Some(cur) = work.pop() {
            if !visited.insert(cur) {
                continue;
            }
            let obj = self.get(cur);
            if let Some(kind) = &obj.kind {
                return kind;
            }
            for &mimic in obj.mimics.iter().rev() {
                work.push(mimic);
            }
        }
        "Object"
    }

    /// Ancestry test: is `kind` anywhere in `obj`'s resolvable mimic
    /// closure (including `obj` itself)? Used for condition-kind
    /// matching during handler search.
    pub fn is_kind(&self, obj: ObjRef, kind: ObjRef) -> bool {
        let mut visited = FxHashSet::default();
        let mut work = vec![obj];
        while let Some(cur) = work.pop() {
            if !visited.insert(cur) {
                continue;
            }
            if cur == kind {
                return true;
            }
            for &mimic in self.get(cur).mimics.iter().rev() {
                work.push(mimic);
            }
        }
        false
    }
}
