//! The managed heap: slot arena, allocation accounting, and the tri-color
//! mark-sweep collector.
//!
//! Objects occupy slots in a vector; freed slots are threaded onto an
//! intrusive free list and reused by later allocations, so handles stay
//! dense and sweeping is a single linear walk.
//!
//! The heap owns every object exclusively. All other references are
//! non-owning [`ObjRef`] handles whose liveness is proven by reachability
//! during a collection cycle. A cycle is driven from outside (see the
//! crate docs): the mutator grays its roots, then `trace_references`,
//! intern filtering, and `sweep` run back to back with the mutator paused.

use karst_bc::{ObjRef, Value};

use crate::config::{ConfigError, GcConfig};
use crate::object::{Obj, ObjClosure, ObjFunction, ObjNative, ObjString, ObjUpvalue};
use crate::stats::GcStats;

/// One arena slot.
enum Slot {
    Live {
        /// Cleared by sweep, set by mark.
        marked: bool,
        /// Recorded at allocation time for accounting symmetry on free.
        size: usize,
        obj: Obj,
    },
    /// A freed slot, linking to the next free slot.
    Free { next_free: Option<u32> },
}

/// The managed heap.
pub struct Heap {
    slots: Vec<Slot>,
    free_head: Option<u32>,

    /// Running total of live object bytes.
    bytes_allocated: usize,
    /// Threshold that triggers the next collection.
    next_gc: usize,

    /// Gray worklist: marked but not yet traversed.
    gray: Vec<ObjRef>,

    config: GcConfig,
    stats: GcStats,
}

impl Heap {
    /// Creates an empty heap with the given collector configuration.
    pub fn new(config: GcConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Heap {
            slots: Vec::new(),
            free_head: None,
            bytes_allocated: 0,
            next_gc: config.initial_threshold,
            gray: Vec::new(),
            config,
            stats: GcStats::default(),
        })
    }

    pub fn config(&self) -> &GcConfig {
        &self.config
    }

    pub fn stats(&self) -> GcStats {
        self.stats
    }

    pub fn bytes_allocated(&self) -> usize {
        self.bytes_allocated
    }

    // ------------------------------------------------------------------
    // Allocation
    // ------------------------------------------------------------------

    /// Allocates `obj`, reusing a free slot when one is available.
    ///
    /// Allocation never collects. Callers that can trigger a collection
    /// must check [`Heap::should_collect`] *before* constructing the
    /// object, while every operand is still reachable from a root.
    pub fn alloc(&mut self, obj: Obj) -> ObjRef {
        let size = obj.heap_size();
        self.bytes_allocated += size;
        self.stats.objects_allocated += 1;
        log::trace!("alloc {} bytes ({})", size, obj.kind_name());

        let slot = Slot::Live {
            marked: false,
            size,
            obj,
        };

        match self.free_head {
            Some(index) => {
                let index = index as usize;
                self.free_head = match self.slots[index] {
                    Slot::Free { next_free } => next_free,
                    Slot::Live { .. } => unreachable!("free list points at a live slot"),
                };
                self.slots[index] = slot;
                ObjRef::new(index)
            }
            None => {
                self.slots.push(slot);
                ObjRef::new(self.slots.len() - 1)
            }
        }
    }

    /// True when the next allocation should be preceded by a collection.
    pub fn should_collect(&self) -> bool {
        self.config.stress || self.bytes_allocated > self.next_gc
    }

    // ------------------------------------------------------------------
    // Object access
    // ------------------------------------------------------------------

    /// Returns the object behind `r`.
    ///
    /// # Panics
    ///
    /// Panics if the slot has been freed; a handle outliving its object
    /// means a root was missed during collection.
    pub fn get(&self, r: ObjRef) -> &Obj {
        match &self.slots[r.index()] {
            Slot::Live { obj, .. } => obj,
            Slot::Free { .. } => panic!("use of freed object slot {}", r.index()),
        }
    }

    /// Mutable access to the object behind `r`.
    pub fn get_mut(&mut self, r: ObjRef) -> &mut Obj {
        match &mut self.slots[r.index()] {
            Slot::Live { obj, .. } => obj,
            Slot::Free { .. } => panic!("use of freed object slot {}", r.index()),
        }
    }

    /// The string behind `r`. Panics if `r` is not a string.
    pub fn string(&self, r: ObjRef) -> &ObjString {
        match self.get(r) {
            Obj::String(s) => s,
            other => panic!("expected string, found {}", other.kind_name()),
        }
    }

    /// The function behind `r`. Panics if `r` is not a function.
    pub fn function(&self, r: ObjRef) -> &ObjFunction {
        match self.get(r) {
            Obj::Function(f) => f,
            other => panic!("expected function, found {}", other.kind_name()),
        }
    }

    /// The closure behind `r`. Panics if `r` is not a closure.
    pub fn closure(&self, r: ObjRef) -> &ObjClosure {
        match self.get(r) {
            Obj::Closure(c) => c,
            other => panic!("expected closure, found {}", other.kind_name()),
        }
    }

    /// The upvalue behind `r`. Panics if `r` is not an upvalue.
    pub fn upvalue(&self, r: ObjRef) -> ObjUpvalue {
        match self.get(r) {
            Obj::Upvalue(u) => *u,
            other => panic!("expected upvalue, found {}", other.kind_name()),
        }
    }

    /// Overwrites the upvalue behind `r`.
    pub fn set_upvalue(&mut self, r: ObjRef, upvalue: ObjUpvalue) {
        match self.get_mut(r) {
            Obj::Upvalue(u) => *u = upvalue,
            other => panic!("expected upvalue, found {}", other.kind_name()),
        }
    }

    /// The native behind `r`. Panics if `r` is not a native.
    pub fn native(&self, r: ObjRef) -> &ObjNative {
        match self.get(r) {
            Obj::Native(n) => n,
            other => panic!("expected native, found {}", other.kind_name()),
        }
    }

    fn function_constant(&self, r: ObjRef, index: usize) -> Value {
        self.function(r).chunk.constants[index]
    }

    fn closure_upvalue(&self, r: ObjRef, index: usize) -> ObjRef {
        self.closure(r).upvalues[index]
    }

    // ------------------------------------------------------------------
    // Collection
    // ------------------------------------------------------------------

    /// Starts a collection cycle.
    pub fn begin_cycle(&mut self) {
        debug_assert!(self.gray.is_empty());
        log::debug!("gc begin: {} bytes allocated", self.bytes_allocated);
        if self.config.log {
            eprintln!("[gc] begin: {} bytes allocated", self.bytes_allocated);
        }
    }

    /// Grays the object a value references, if any.
    pub fn mark_value(&mut self, value: Value) {
        if let Value::Obj(r) = value {
            self.mark_object(r);
        }
    }

    /// Grays `r` unless it is already marked.
    pub fn mark_object(&mut self, r: ObjRef) {
        match &mut self.slots[r.index()] {
            Slot::Live { marked, .. } => {
                if !*marked {
                    *marked = true;
                    self.gray.push(r);
                }
            }
            Slot::Free { .. } => panic!("marked freed object slot {}", r.index()),
        }
    }

    /// Whether `r` was marked in the current cycle. Meaningful only
    /// between marking and sweeping.
    pub fn is_marked(&self, r: ObjRef) -> bool {
        match &self.slots[r.index()] {
            Slot::Live { marked, .. } => *marked,
            Slot::Free { .. } => false,
        }
    }

    /// Drains the gray worklist, blackening each object by marking
    /// everything it references.
    pub fn trace_references(&mut self) {
        while let Some(r) = self.gray.pop() {
            self.blacken(r);
        }
    }

    fn blacken(&mut self, r: ObjRef) {
        // Copy the outgoing edges out first; marking mutates other slots.
        let outgoing = match self.get(r) {
            Obj::String(_) | Obj::Upvalue(ObjUpvalue::Open(_)) => Outgoing::None,
            Obj::Upvalue(ObjUpvalue::Closed(value)) => Outgoing::One(*value),
            Obj::Native(native) => Outgoing::One(Value::Obj(native.name)),
            Obj::Function(function) => Outgoing::Function {
                name: function.name,
                constants: function.chunk.constants.len(),
            },
            Obj::Closure(closure) => Outgoing::Closure {
                function: closure.function,
                upvalues: closure.upvalues.len(),
            },
        };

        match outgoing {
            Outgoing::None => {}
            Outgoing::One(value) => self.mark_value(value),
            Outgoing::Function { name, constants } => {
                if let Some(name) = name {
                    self.mark_object(name);
                }
                for i in 0..constants {
                    let constant = self.function_constant(r, i);
                    self.mark_value(constant);
                }
            }
            Outgoing::Closure { function, upvalues } => {
                self.mark_object(function);
                for i in 0..upvalues {
                    let upvalue = self.closure_upvalue(r, i);
                    self.mark_object(upvalue);
                }
            }
        }
    }

    /// Frees every unmarked object, clears surviving marks, and repaces
    /// the next collection.
    pub fn sweep(&mut self) {
        debug_assert!(self.gray.is_empty());

        let mut freed_objects: u64 = 0;
        let mut freed_bytes: usize = 0;

        for index in 0..self.slots.len() {
            match &mut self.slots[index] {
                Slot::Live { marked: marked @ true, .. } => *marked = false,
                Slot::Live { marked: false, size, .. } => {
                    freed_objects += 1;
                    freed_bytes += *size;
                    self.slots[index] = Slot::Free {
                        next_free: self.free_head,
                    };
                    self.free_head = Some(index as u32);
                }
                Slot::Free { .. } => {}
            }
        }

        self.bytes_allocated -= freed_bytes;
        self.stats.objects_freed += freed_objects;
        self.stats.bytes_freed += freed_bytes as u64;
        self.stats.cycles += 1;

        self.next_gc = (self.bytes_allocated * self.config.growth_factor)
            .max(self.config.initial_threshold);

        log::debug!(
            "gc end: freed {} objects / {} bytes, {} bytes live, next at {}",
            freed_objects,
            freed_bytes,
            self.bytes_allocated,
            self.next_gc
        );
        if self.config.log {
            eprintln!(
                "[gc] end: freed {} objects / {} bytes, {} bytes live",
                freed_objects, freed_bytes, self.bytes_allocated
            );
        }
    }

    // ------------------------------------------------------------------
    // Introspection
    // ------------------------------------------------------------------

    /// Number of live objects in the arena.
    pub fn live_objects(&self) -> usize {
        self.slots
            .iter()
            .filter(|slot| matches!(slot, Slot::Live { .. }))
            .count()
    }

    /// Sum of live object sizes, recomputed from slot headers. Always
    /// equals [`Heap::bytes_allocated`]; tests assert the equivalence.
    pub fn live_bytes(&self) -> usize {
        self.slots
            .iter()
            .map(|slot| match slot {
                Slot::Live { size, .. } => *size,
                Slot::Free { .. } => 0,
            })
            .sum()
    }

    // ------------------------------------------------------------------
    // Rendering
    // ------------------------------------------------------------------

    /// Renders a value the way `print` shows it.
    pub fn display_value(&self, value: Value) -> String {
        match value {
            Value::Nil => "nil".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => format_number(n),
            Value::Obj(r) => self.display_object(r),
        }
    }

    fn display_object(&self, r: ObjRef) -> String {
        match self.get(r) {
            Obj::String(s) => s.chars.to_string(),
            Obj::Function(f) => self.display_function(f.name),
            Obj::Closure(c) => self.display_function(self.function(c.function).name),
            Obj::Upvalue(_) => "upvalue".to_string(),
            Obj::Native(_) => "<native fn>".to_string(),
        }
    }

    fn display_function(&self, name: Option<ObjRef>) -> String {
        match name {
            Some(name) => format!("<fn {}>", self.string(name).chars),
            None => "<script>".to_string(),
        }
    }
}

/// Outgoing edges of one object, copied out before marking resumes.
enum Outgoing {
    None,
    One(Value),
    Function {
        name: Option<ObjRef>,
        constants: usize,
    },
    Closure {
        function: ObjRef,
        upvalues: usize,
    },
}

/// Integral numbers render without a decimal part.
fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}
