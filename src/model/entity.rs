//! Entity kinds held by the match graph.
//!
//! Entities are created once by the loader and live for the session. The
//! only fields that mutate afterwards are the match link, the tentative
//! (tmp) name, and the mapped name; everything structural is read-only.

use serde::{Deserialize, Serialize};

/// One of the two inputs being matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    A,
    B,
}

impl Side {
    /// The other input.
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::A => Self::B,
            Self::B => Self::A,
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::A => write!(f, "a"),
            Self::B => write!(f, "b"),
        }
    }
}

/// High bit of a handle marks side B; the low 31 bits are the arena index.
const SIDE_B_BIT: u32 = 1 << 31;

macro_rules! entity_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        ///
        /// Handles carry the side whose arena issued them, so the graph can
        /// reject ids that are handed back against the wrong side.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub(crate) u32);

        impl $name {
            pub(crate) fn new(side: Side, index: usize) -> Self {
                debug_assert!(index < SIDE_B_BIT as usize);
                match side {
                    Side::A => Self(index as u32),
                    Side::B => Self(index as u32 | SIDE_B_BIT),
                }
            }

            /// Side whose arena issued this handle.
            pub(crate) const fn side(self) -> Side {
                if self.0 & SIDE_B_BIT == 0 {
                    Side::A
                } else {
                    Side::B
                }
            }

            #[inline]
            pub(crate) const fn index(self) -> usize {
                (self.0 & !SIDE_B_BIT) as usize
            }

            /// Raw tagged handle value, for cache keys and diagnostics.
            #[must_use]
            pub const fn raw(self) -> u32 {
                self.0
            }
        }
    };
}

entity_id!(
    /// Handle to a class within one side's arena.
    ClassId
);
entity_id!(
    /// Handle to a method within one side's arena.
    MethodId
);
entity_id!(
    /// Handle to a field within one side's arena.
    FieldId
);
entity_id!(
    /// Handle to a method var within one side's arena.
    VarId
);

/// Whether a method var is an argument or a local.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VarKind {
    Arg,
    Local,
}

// ============================================================================
// Instruction stream
// ============================================================================

/// One instruction of a method's opaque stream.
///
/// The matcher never interprets instructions; classifiers only compare
/// opcode sequences and harvest constants that survive obfuscation.
#[derive(Debug, Clone, PartialEq)]
pub struct Insn {
    pub opcode: u8,
    pub operand: InsnOperand,
}

/// Operand payload of an [`Insn`], limited to what classifiers consume.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum InsnOperand {
    #[default]
    None,
    Int(i64),
    Str(String),
    Type(String),
    MemberRef {
        owner: String,
        name: String,
        desc: String,
    },
    Var(u16),
    Jump(i32),
}

impl Insn {
    /// An operand-less instruction.
    #[must_use]
    pub const fn simple(opcode: u8) -> Self {
        Self {
            opcode,
            operand: InsnOperand::None,
        }
    }

    /// A string-constant load.
    #[must_use]
    pub fn ldc_str(opcode: u8, value: impl Into<String>) -> Self {
        Self {
            opcode,
            operand: InsnOperand::Str(value.into()),
        }
    }

    /// An integer-constant load.
    #[must_use]
    pub const fn ldc_int(opcode: u8, value: i64) -> Self {
        Self {
            opcode,
            operand: InsnOperand::Int(value),
        }
    }

    /// A member access (field or method reference).
    #[must_use]
    pub fn member(
        opcode: u8,
        owner: impl Into<String>,
        name: impl Into<String>,
        desc: impl Into<String>,
    ) -> Self {
        Self {
            opcode,
            operand: InsnOperand::MemberRef {
                owner: owner.into(),
                name: name.into(),
                desc: desc.into(),
            },
        }
    }

    /// A local-variable slot access.
    #[must_use]
    pub const fn var(opcode: u8, slot: u16) -> Self {
        Self {
            opcode,
            operand: InsnOperand::Var(slot),
        }
    }
}

// ============================================================================
// Entities
// ============================================================================

/// A class on side A or B.
#[derive(Debug)]
pub struct ClassEntity {
    pub(crate) id: String,
    pub(crate) name: String,
    pub(crate) array_dims: u8,
    pub(crate) element: Option<ClassId>,
    pub(crate) arrays: Vec<ClassId>,
    pub(crate) superclass: Option<ClassId>,
    pub(crate) interfaces: Vec<ClassId>,
    pub(crate) methods: Vec<MethodId>,
    pub(crate) fields: Vec<FieldId>,
    pub(crate) origin: Option<String>,
    pub(crate) name_obfuscated: bool,
    pub(crate) matched: Option<ClassId>,
    pub(crate) mapped_name: Option<String>,
    pub(crate) tmp_name: Option<String>,
}

impl ClassEntity {
    /// Stable id (type descriptor).
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Original (possibly obfuscated) name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub const fn array_dims(&self) -> u8 {
        self.array_dims
    }

    #[must_use]
    pub const fn is_array(&self) -> bool {
        self.array_dims > 0
    }

    /// Base element class when this is an array class.
    #[must_use]
    pub const fn element(&self) -> Option<ClassId> {
        self.element
    }

    /// Live array classes whose element is this class.
    #[must_use]
    pub fn arrays(&self) -> &[ClassId] {
        &self.arrays
    }

    #[must_use]
    pub const fn superclass(&self) -> Option<ClassId> {
        self.superclass
    }

    #[must_use]
    pub fn interfaces(&self) -> &[ClassId] {
        &self.interfaces
    }

    /// Methods in load order.
    #[must_use]
    pub fn methods(&self) -> &[MethodId] {
        &self.methods
    }

    /// Fields in load order.
    #[must_use]
    pub fn fields(&self) -> &[FieldId] {
        &self.fields
    }

    /// URI of the input artifact this class came from; `None` means the
    /// class was synthesized or stems from a library placeholder.
    #[must_use]
    pub fn origin(&self) -> Option<&str> {
        self.origin.as_deref()
    }

    /// Whether this class is part of the matchable input set.
    #[must_use]
    pub const fn is_input(&self) -> bool {
        self.origin.is_some()
    }

    #[must_use]
    pub const fn name_obfuscated(&self) -> bool {
        self.name_obfuscated
    }

    /// Peer on the opposite side, if matched.
    #[must_use]
    pub const fn matched(&self) -> Option<ClassId> {
        self.matched
    }

    /// This entity's own mapped name (no peer fallback).
    #[must_use]
    pub fn mapped_name(&self) -> Option<&str> {
        self.mapped_name.as_deref()
    }

    #[must_use]
    pub fn tmp_name(&self) -> Option<&str> {
        self.tmp_name.as_deref()
    }

    /// Set the mapped name; returns false if one was already present.
    pub fn set_mapped_name(&mut self, name: impl Into<String>) -> bool {
        if self.mapped_name.is_some() {
            return false;
        }
        self.mapped_name = Some(name.into());
        true
    }

    /// Set the per-session tentative name; returns false if already present.
    pub fn set_tmp_name(&mut self, name: impl Into<String>) -> bool {
        if self.tmp_name.is_some() {
            return false;
        }
        self.tmp_name = Some(name.into());
        true
    }

    pub(crate) fn set_matched(&mut self, matched: Option<ClassId>) {
        self.matched = matched;
    }
}

/// A method member of a class.
#[derive(Debug)]
pub struct MethodEntity {
    pub(crate) class: ClassId,
    pub(crate) name: String,
    pub(crate) desc: String,
    pub(crate) ret: Option<ClassId>,
    pub(crate) args: Vec<VarId>,
    pub(crate) locals: Vec<VarId>,
    pub(crate) hierarchy: Vec<MethodId>,
    pub(crate) insns: Vec<Insn>,
    pub(crate) position: u32,
    pub(crate) real: bool,
    pub(crate) name_obfuscated: bool,
    pub(crate) matched: Option<MethodId>,
    pub(crate) mapped_name: Option<String>,
    pub(crate) tmp_name: Option<String>,
}

impl MethodEntity {
    /// Owning class.
    #[must_use]
    pub const fn class(&self) -> ClassId {
        self.class
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn desc(&self) -> &str {
        &self.desc
    }

    /// Composite id: name + descriptor.
    #[must_use]
    pub fn id(&self) -> String {
        format!("{}{}", self.name, self.desc)
    }

    /// Return type, `None` for void.
    #[must_use]
    pub const fn ret(&self) -> Option<ClassId> {
        self.ret
    }

    /// Argument vars in declaration order.
    #[must_use]
    pub fn args(&self) -> &[VarId] {
        &self.args
    }

    /// Local vars in declaration order.
    #[must_use]
    pub fn locals(&self) -> &[VarId] {
        &self.locals
    }

    /// The override hierarchy set; always contains this method itself.
    #[must_use]
    pub fn hierarchy(&self) -> &[MethodId] {
        &self.hierarchy
    }

    /// Opaque instruction stream.
    #[must_use]
    pub fn insns(&self) -> &[Insn] {
        &self.insns
    }

    /// Position among the owning class's methods.
    #[must_use]
    pub const fn position(&self) -> u32 {
        self.position
    }

    /// Whether the method is actually present (vs a synthesized hierarchy
    /// placeholder).
    #[must_use]
    pub const fn is_real(&self) -> bool {
        self.real
    }

    #[must_use]
    pub const fn name_obfuscated(&self) -> bool {
        self.name_obfuscated
    }

    #[must_use]
    pub const fn matched(&self) -> Option<MethodId> {
        self.matched
    }

    #[must_use]
    pub fn mapped_name(&self) -> Option<&str> {
        self.mapped_name.as_deref()
    }

    #[must_use]
    pub fn tmp_name(&self) -> Option<&str> {
        self.tmp_name.as_deref()
    }

    /// Set the mapped name; returns false if one was already present.
    pub fn set_mapped_name(&mut self, name: impl Into<String>) -> bool {
        if self.mapped_name.is_some() {
            return false;
        }
        self.mapped_name = Some(name.into());
        true
    }

    pub fn set_tmp_name(&mut self, name: impl Into<String>) -> bool {
        if self.tmp_name.is_some() {
            return false;
        }
        self.tmp_name = Some(name.into());
        true
    }

    pub(crate) fn set_matched(&mut self, matched: Option<MethodId>) {
        self.matched = matched;
    }
}

/// A field member of a class.
#[derive(Debug)]
pub struct FieldEntity {
    pub(crate) class: ClassId,
    pub(crate) name: String,
    pub(crate) desc: String,
    pub(crate) typ: Option<ClassId>,
    pub(crate) position: u32,
    pub(crate) real: bool,
    pub(crate) name_obfuscated: bool,
    pub(crate) matched: Option<FieldId>,
    pub(crate) mapped_name: Option<String>,
    pub(crate) tmp_name: Option<String>,
}

impl FieldEntity {
    #[must_use]
    pub const fn class(&self) -> ClassId {
        self.class
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn desc(&self) -> &str {
        &self.desc
    }

    /// Composite id: name + descriptor.
    #[must_use]
    pub fn id(&self) -> String {
        format!("{}{}", self.name, self.desc)
    }

    /// Resolved field type when known.
    #[must_use]
    pub const fn typ(&self) -> Option<ClassId> {
        self.typ
    }

    /// Position among the owning class's fields.
    #[must_use]
    pub const fn position(&self) -> u32 {
        self.position
    }

    #[must_use]
    pub const fn is_real(&self) -> bool {
        self.real
    }

    #[must_use]
    pub const fn name_obfuscated(&self) -> bool {
        self.name_obfuscated
    }

    #[must_use]
    pub const fn matched(&self) -> Option<FieldId> {
        self.matched
    }

    #[must_use]
    pub fn mapped_name(&self) -> Option<&str> {
        self.mapped_name.as_deref()
    }

    #[must_use]
    pub fn tmp_name(&self) -> Option<&str> {
        self.tmp_name.as_deref()
    }

    pub fn set_mapped_name(&mut self, name: impl Into<String>) -> bool {
        if self.mapped_name.is_some() {
            return false;
        }
        self.mapped_name = Some(name.into());
        true
    }

    pub fn set_tmp_name(&mut self, name: impl Into<String>) -> bool {
        if self.tmp_name.is_some() {
            return false;
        }
        self.tmp_name = Some(name.into());
        true
    }

    pub(crate) fn set_matched(&mut self, matched: Option<FieldId>) {
        self.matched = matched;
    }
}

/// An argument or local var belonging to a single method.
#[derive(Debug)]
pub struct VarEntity {
    pub(crate) method: MethodId,
    pub(crate) kind: VarKind,
    pub(crate) index: u32,
    pub(crate) lv_index: u32,
    pub(crate) asm_index: u32,
    pub(crate) typ: Option<ClassId>,
    pub(crate) start_insn: u32,
    pub(crate) end_insn: u32,
    pub(crate) name: String,
    pub(crate) name_obfuscated: bool,
    pub(crate) matched: Option<VarId>,
    pub(crate) mapped_name: Option<String>,
    pub(crate) tmp_name: Option<String>,
}

impl VarEntity {
    /// Owning method.
    #[must_use]
    pub const fn method(&self) -> MethodId {
        self.method
    }

    #[must_use]
    pub const fn kind(&self) -> VarKind {
        self.kind
    }

    #[must_use]
    pub const fn is_arg(&self) -> bool {
        matches!(self.kind, VarKind::Arg)
    }

    /// Position among the method's arg vars (or local vars).
    #[must_use]
    pub const fn index(&self) -> u32 {
        self.index
    }

    /// Slot number in the local-variable table.
    #[must_use]
    pub const fn lv_index(&self) -> u32 {
        self.lv_index
    }

    /// Ordinal within the underlying instruction stream.
    #[must_use]
    pub const fn asm_index(&self) -> u32 {
        self.asm_index
    }

    #[must_use]
    pub const fn typ(&self) -> Option<ClassId> {
        self.typ
    }

    /// Inclusive start of the var's live range.
    #[must_use]
    pub const fn start_insn(&self) -> u32 {
        self.start_insn
    }

    /// Exclusive end of the var's live range.
    #[must_use]
    pub const fn end_insn(&self) -> u32 {
        self.end_insn
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub const fn name_obfuscated(&self) -> bool {
        self.name_obfuscated
    }

    #[must_use]
    pub const fn matched(&self) -> Option<VarId> {
        self.matched
    }

    #[must_use]
    pub fn mapped_name(&self) -> Option<&str> {
        self.mapped_name.as_deref()
    }

    #[must_use]
    pub fn tmp_name(&self) -> Option<&str> {
        self.tmp_name.as_deref()
    }

    pub fn set_mapped_name(&mut self, name: impl Into<String>) -> bool {
        if self.mapped_name.is_some() {
            return false;
        }
        self.mapped_name = Some(name.into());
        true
    }

    pub fn set_tmp_name(&mut self, name: impl Into<String>) -> bool {
        if self.tmp_name.is_some() {
            return false;
        }
        self.tmp_name = Some(name.into());
        true
    }

    pub(crate) fn set_matched(&mut self, matched: Option<VarId>) {
        self.matched = matched;
    }
}

// ============================================================================
// Loader declarations
// ============================================================================

/// Declaration of a class, consumed by [`MatchGraph::add_class`].
///
/// [`MatchGraph::add_class`]: super::MatchGraph::add_class
#[derive(Debug, Clone, Default)]
pub struct ClassDecl {
    /// Stable type-descriptor id, e.g. `La;`.
    pub id: String,
    /// Original name, e.g. `a`.
    pub name: String,
    /// Input artifact URI; `None` marks a synthesized/library placeholder.
    pub origin: Option<String>,
    pub name_obfuscated: bool,
}

impl ClassDecl {
    /// Declaration of a name-obfuscated class loaded from an input artifact.
    #[must_use]
    pub fn input(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            origin: Some("input".to_string()),
            name_obfuscated: true,
        }
    }

    #[must_use]
    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self
    }

    #[must_use]
    pub fn not_obfuscated(mut self) -> Self {
        self.name_obfuscated = false;
        self
    }
}

/// Declaration of a method, consumed by [`MatchGraph::add_method`].
///
/// [`MatchGraph::add_method`]: super::MatchGraph::add_method
#[derive(Debug, Clone)]
pub struct MethodDecl {
    pub name: String,
    pub desc: String,
    pub ret: Option<ClassId>,
    pub args: Vec<VarDecl>,
    pub locals: Vec<VarDecl>,
    pub insns: Vec<Insn>,
    pub real: bool,
    pub name_obfuscated: bool,
}

impl MethodDecl {
    #[must_use]
    pub fn new(name: impl Into<String>, desc: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            desc: desc.into(),
            ret: None,
            args: Vec::new(),
            locals: Vec::new(),
            insns: Vec::new(),
            real: true,
            name_obfuscated: true,
        }
    }

    #[must_use]
    pub fn not_obfuscated(mut self) -> Self {
        self.name_obfuscated = false;
        self
    }

    #[must_use]
    pub fn placeholder(mut self) -> Self {
        self.real = false;
        self
    }

    #[must_use]
    pub fn with_insns(mut self, insns: Vec<Insn>) -> Self {
        self.insns = insns;
        self
    }

    #[must_use]
    pub fn with_args(mut self, args: Vec<VarDecl>) -> Self {
        self.args = args;
        self
    }

    #[must_use]
    pub fn with_locals(mut self, locals: Vec<VarDecl>) -> Self {
        self.locals = locals;
        self
    }

    #[must_use]
    pub fn with_ret(mut self, ret: ClassId) -> Self {
        self.ret = Some(ret);
        self
    }
}

/// Declaration of a field, consumed by [`MatchGraph::add_field`].
///
/// [`MatchGraph::add_field`]: super::MatchGraph::add_field
#[derive(Debug, Clone)]
pub struct FieldDecl {
    pub name: String,
    pub desc: String,
    pub typ: Option<ClassId>,
    pub real: bool,
    pub name_obfuscated: bool,
}

impl FieldDecl {
    #[must_use]
    pub fn new(name: impl Into<String>, desc: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            desc: desc.into(),
            typ: None,
            real: true,
            name_obfuscated: true,
        }
    }

    #[must_use]
    pub fn not_obfuscated(mut self) -> Self {
        self.name_obfuscated = false;
        self
    }

    #[must_use]
    pub fn with_typ(mut self, typ: ClassId) -> Self {
        self.typ = Some(typ);
        self
    }
}

/// Declaration of an arg or local var inside a [`MethodDecl`].
#[derive(Debug, Clone, Default)]
pub struct VarDecl {
    pub name: String,
    pub name_obfuscated: bool,
    pub lv_index: u32,
    pub asm_index: u32,
    pub typ: Option<ClassId>,
    pub start_insn: u32,
    pub end_insn: u32,
}

impl VarDecl {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            name_obfuscated: true,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_typ(mut self, typ: ClassId) -> Self {
        self.typ = Some(typ);
        self
    }

    #[must_use]
    pub const fn with_slot(mut self, lv_index: u32) -> Self {
        self.lv_index = lv_index;
        self
    }

    #[must_use]
    pub const fn with_range(mut self, start: u32, end: u32) -> Self {
        self.start_insn = start;
        self.end_insn = end;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_side_opposite() {
        assert_eq!(Side::A.opposite(), Side::B);
        assert_eq!(Side::B.opposite(), Side::A);
    }

    #[test]
    fn test_entity_ids_carry_their_side() {
        let a = ClassId::new(Side::A, 5);
        let b = ClassId::new(Side::B, 5);
        assert_ne!(a, b, "same index on different sides must not collide");
        assert_eq!(a.index(), b.index());
        assert_eq!(a.side(), Side::A);
        assert_eq!(b.side(), Side::B);
    }

    #[test]
    fn test_method_composite_id() {
        let decl = MethodDecl::new("a", "(I)V");
        assert_eq!(decl.name, "a");
        assert_eq!(decl.desc, "(I)V");
    }

    #[test]
    fn test_insn_constructors() {
        let insn = Insn::ldc_str(0x12, "hello");
        assert_eq!(insn.opcode, 0x12);
        assert_eq!(insn.operand, InsnOperand::Str("hello".to_string()));

        let insn = Insn::simple(0xb1);
        assert_eq!(insn.operand, InsnOperand::None);
    }
}
