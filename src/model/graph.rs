//! The two-sided entity graph and its query/population surface.
//!
//! `MatchGraph` owns one [`EntitySet`] arena per side plus the process-scoped
//! classifier cache. Entity handles are side-tagged arena indices; the
//! population surface refuses handles issued by the opposite side, since the
//! two sides' indices overlap.
//!
//! Match links are private: the arbiter re-establishes bidirectional symmetry
//! through the `pub(crate)` mutators, and nothing else touches them.

use indexmap::IndexMap;

use super::cache::ClassifierCache;
use super::entity::{
    ClassDecl, ClassEntity, ClassId, FieldDecl, FieldEntity, FieldId, MethodDecl, MethodEntity,
    MethodId, Side, VarDecl, VarEntity, VarId, VarKind,
};
use crate::error::{ClassMatchError, GraphErrorKind, Result};

/// One side's entity arenas.
#[derive(Debug)]
pub struct EntitySet {
    side: Side,
    classes: Vec<ClassEntity>,
    methods: Vec<MethodEntity>,
    fields: Vec<FieldEntity>,
    vars: Vec<VarEntity>,
    classes_by_id: IndexMap<String, ClassId>,
}

impl EntitySet {
    fn new(side: Side) -> Self {
        Self {
            side,
            classes: Vec::new(),
            methods: Vec::new(),
            fields: Vec::new(),
            vars: Vec::new(),
            classes_by_id: IndexMap::new(),
        }
    }

    #[must_use]
    pub const fn side(&self) -> Side {
        self.side
    }

    #[must_use]
    pub fn class(&self, id: ClassId) -> &ClassEntity {
        debug_assert_eq!(id.side(), self.side, "class handle from the wrong side");
        &self.classes[id.index()]
    }

    #[must_use]
    pub fn method(&self, id: MethodId) -> &MethodEntity {
        debug_assert_eq!(id.side(), self.side, "method handle from the wrong side");
        &self.methods[id.index()]
    }

    #[must_use]
    pub fn field(&self, id: FieldId) -> &FieldEntity {
        debug_assert_eq!(id.side(), self.side, "field handle from the wrong side");
        &self.fields[id.index()]
    }

    #[must_use]
    pub fn var(&self, id: VarId) -> &VarEntity {
        debug_assert_eq!(id.side(), self.side, "var handle from the wrong side");
        &self.vars[id.index()]
    }

    /// All classes in load order.
    pub fn class_ids(&self) -> impl Iterator<Item = ClassId> + '_ {
        (0..self.classes.len()).map(|i| ClassId::new(self.side, i))
    }

    pub fn method_ids(&self) -> impl Iterator<Item = MethodId> + '_ {
        (0..self.methods.len()).map(|i| MethodId::new(self.side, i))
    }

    pub fn field_ids(&self) -> impl Iterator<Item = FieldId> + '_ {
        (0..self.fields.len()).map(|i| FieldId::new(self.side, i))
    }

    pub fn var_ids(&self) -> impl Iterator<Item = VarId> + '_ {
        (0..self.vars.len()).map(|i| VarId::new(self.side, i))
    }

    #[must_use]
    pub fn class_count(&self) -> usize {
        self.classes.len()
    }

    /// Look up a class by its stable type-descriptor id.
    #[must_use]
    pub fn cls_by_id(&self, id: &str) -> Option<ClassId> {
        self.classes_by_id.get(id).copied()
    }

    /// Look up a method by composite id (name + descriptor).
    #[must_use]
    pub fn method_by_id(&self, class: ClassId, id: &str) -> Option<MethodId> {
        self.class(class)
            .methods()
            .iter()
            .copied()
            .find(|&m| self.method(m).id() == id)
    }

    /// Look up a method by name alone; succeeds only when exactly one
    /// candidate exists.
    #[must_use]
    pub fn method_by_name(&self, class: ClassId, name: &str) -> Option<MethodId> {
        let mut it = self
            .class(class)
            .methods()
            .iter()
            .copied()
            .filter(|&m| self.method(m).name() == name);
        match (it.next(), it.next()) {
            (Some(m), None) => Some(m),
            _ => None,
        }
    }

    /// Look up a field by composite id (name + descriptor).
    #[must_use]
    pub fn field_by_id(&self, class: ClassId, id: &str) -> Option<FieldId> {
        self.class(class)
            .fields()
            .iter()
            .copied()
            .find(|&f| self.field(f).id() == id)
    }

    /// Look up a field by name alone; succeeds only when exactly one
    /// candidate exists.
    #[must_use]
    pub fn field_by_name(&self, class: ClassId, name: &str) -> Option<FieldId> {
        let mut it = self
            .class(class)
            .fields()
            .iter()
            .copied()
            .filter(|&f| self.field(f).name() == name);
        match (it.next(), it.next()) {
            (Some(f), None) => Some(f),
            _ => None,
        }
    }

    fn class_mut(&mut self, id: ClassId) -> &mut ClassEntity {
        &mut self.classes[id.index()]
    }

    fn method_mut(&mut self, id: MethodId) -> &mut MethodEntity {
        &mut self.methods[id.index()]
    }

    fn field_mut(&mut self, id: FieldId) -> &mut FieldEntity {
        &mut self.fields[id.index()]
    }

    fn var_mut(&mut self, id: VarId) -> &mut VarEntity {
        &mut self.vars[id.index()]
    }

    /// Depth of the superclass chain above the given class.
    #[must_use]
    pub fn hierarchy_depth(&self, class: ClassId) -> usize {
        let mut depth = 0;
        let mut cur = self.class(class).superclass();
        while let Some(c) = cur {
            depth += 1;
            cur = self.class(c).superclass();
        }
        depth
    }
}

/// The full two-sided entity graph.
#[derive(Debug)]
pub struct MatchGraph {
    a: EntitySet,
    b: EntitySet,
    cache: ClassifierCache,
}

impl Default for MatchGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl MatchGraph {
    #[must_use]
    pub fn new() -> Self {
        Self {
            a: EntitySet::new(Side::A),
            b: EntitySet::new(Side::B),
            cache: ClassifierCache::new(),
        }
    }

    #[must_use]
    pub const fn side(&self, side: Side) -> &EntitySet {
        match side {
            Side::A => &self.a,
            Side::B => &self.b,
        }
    }

    fn side_mut(&mut self, side: Side) -> &mut EntitySet {
        match side {
            Side::A => &mut self.a,
            Side::B => &mut self.b,
        }
    }

    /// The process-scoped classifier cache.
    #[must_use]
    pub const fn cache(&self) -> &ClassifierCache {
        &self.cache
    }

    /// Classes on side A, in load order.
    pub fn classes_a(&self) -> impl Iterator<Item = ClassId> + '_ {
        self.a.class_ids()
    }

    /// Classes on side B, in load order.
    pub fn classes_b(&self) -> impl Iterator<Item = ClassId> + '_ {
        self.b.class_ids()
    }

    /// Side-B class lookup by stable id.
    #[must_use]
    pub fn local_cls_by_id_b(&self, id: &str) -> Option<ClassId> {
        self.b.cls_by_id(id)
    }

    // ========================================================================
    // Population (loader surface)
    // ========================================================================

    /// Reject handles that were issued by the opposite side's arena.
    ///
    /// Indices overlap between the two sides, so an unchecked wrong-side id
    /// would silently address an unrelated entity.
    fn ensure_side(op: &str, side: Side, referenced: Side) -> Result<()> {
        if referenced == side {
            Ok(())
        } else {
            Err(ClassMatchError::graph(
                format!("{op} on side {side}"),
                GraphErrorKind::SideMismatch,
            ))
        }
    }

    /// Register a non-array class.
    pub fn add_class(&mut self, side: Side, decl: ClassDecl) -> Result<ClassId> {
        let set = self.side_mut(side);
        if set.classes_by_id.contains_key(&decl.id) {
            return Err(ClassMatchError::graph(
                format!("add class on side {side}"),
                GraphErrorKind::DuplicateClassId(decl.id),
            ));
        }
        let id = ClassId::new(side, set.classes.len());
        set.classes_by_id.insert(decl.id.clone(), id);
        set.classes.push(ClassEntity {
            id: decl.id,
            name: decl.name,
            array_dims: 0,
            element: None,
            arrays: Vec::new(),
            superclass: None,
            interfaces: Vec::new(),
            methods: Vec::new(),
            fields: Vec::new(),
            origin: decl.origin,
            name_obfuscated: decl.name_obfuscated,
            matched: None,
            mapped_name: None,
            tmp_name: None,
        });
        Ok(id)
    }

    /// Register an array class over a non-array element class.
    ///
    /// The id is derived from the element's (`[` per dimension), and the new
    /// class is recorded in the element's live-array set.
    pub fn add_array_class(&mut self, side: Side, element: ClassId, dims: u8) -> Result<ClassId> {
        Self::ensure_side("add array class", side, element.side())?;
        let set = self.side_mut(side);
        if set.class(element).is_array() {
            let id = set.class(element).id().to_string();
            return Err(ClassMatchError::graph(
                format!("add array class on side {side}"),
                GraphErrorKind::NotAnArrayClass(id),
            ));
        }
        let elem = set.class(element);
        let id_str = format!("{}{}", "[".repeat(dims as usize), elem.id());
        let name = format!("{}{}", "[".repeat(dims as usize), elem.name());
        let origin = elem.origin.clone();
        let name_obfuscated = elem.name_obfuscated;
        if set.classes_by_id.contains_key(&id_str) {
            return Err(ClassMatchError::graph(
                format!("add array class on side {side}"),
                GraphErrorKind::DuplicateClassId(id_str),
            ));
        }
        let id = ClassId::new(side, set.classes.len());
        set.classes_by_id.insert(id_str.clone(), id);
        set.classes.push(ClassEntity {
            id: id_str,
            name,
            array_dims: dims,
            element: Some(element),
            arrays: Vec::new(),
            superclass: None,
            interfaces: Vec::new(),
            methods: Vec::new(),
            fields: Vec::new(),
            origin,
            name_obfuscated,
            matched: None,
            mapped_name: None,
            tmp_name: None,
        });
        set.class_mut(element).arrays.push(id);
        Ok(id)
    }

    pub fn set_superclass(&mut self, side: Side, class: ClassId, superclass: ClassId) -> Result<()> {
        Self::ensure_side("set superclass", side, class.side())?;
        Self::ensure_side("set superclass", side, superclass.side())?;
        self.side_mut(side).class_mut(class).superclass = Some(superclass);
        Ok(())
    }

    pub fn add_interface(&mut self, side: Side, class: ClassId, iface: ClassId) -> Result<()> {
        Self::ensure_side("add interface", side, class.side())?;
        Self::ensure_side("add interface", side, iface.side())?;
        self.side_mut(side).class_mut(class).interfaces.push(iface);
        Ok(())
    }

    /// Register a method (with its arg/local vars) on a class.
    pub fn add_method(&mut self, side: Side, class: ClassId, decl: MethodDecl) -> Result<MethodId> {
        Self::ensure_side("add method", side, class.side())?;
        if let Some(ret) = decl.ret {
            Self::ensure_side("add method", side, ret.side())?;
        }
        for var in decl.args.iter().chain(&decl.locals) {
            if let Some(typ) = var.typ {
                Self::ensure_side("add method", side, typ.side())?;
            }
        }
        let set = self.side_mut(side);
        let id = MethodId::new(side, set.methods.len());
        let position = set.class(class).methods().len() as u32;

        let args = Self::push_vars(set, id, VarKind::Arg, decl.args);
        let locals = Self::push_vars(set, id, VarKind::Local, decl.locals);

        set.methods.push(MethodEntity {
            class,
            name: decl.name,
            desc: decl.desc,
            ret: decl.ret,
            args,
            locals,
            hierarchy: vec![id],
            insns: decl.insns,
            position,
            real: decl.real,
            name_obfuscated: decl.name_obfuscated,
            matched: None,
            mapped_name: None,
            tmp_name: None,
        });
        set.class_mut(class).methods.push(id);
        Ok(id)
    }

    fn push_vars(
        set: &mut EntitySet,
        method: MethodId,
        kind: VarKind,
        decls: Vec<VarDecl>,
    ) -> Vec<VarId> {
        decls
            .into_iter()
            .enumerate()
            .map(|(index, decl)| {
                let id = VarId::new(set.side, set.vars.len());
                set.vars.push(VarEntity {
                    method,
                    kind,
                    index: index as u32,
                    lv_index: decl.lv_index,
                    asm_index: decl.asm_index,
                    typ: decl.typ,
                    start_insn: decl.start_insn,
                    end_insn: decl.end_insn,
                    name: decl.name,
                    name_obfuscated: decl.name_obfuscated,
                    matched: None,
                    mapped_name: None,
                    tmp_name: None,
                });
                id
            })
            .collect()
    }

    /// Register a field on a class.
    pub fn add_field(&mut self, side: Side, class: ClassId, decl: FieldDecl) -> Result<FieldId> {
        Self::ensure_side("add field", side, class.side())?;
        if let Some(typ) = decl.typ {
            Self::ensure_side("add field", side, typ.side())?;
        }
        let set = self.side_mut(side);
        let id = FieldId::new(side, set.fields.len());
        let position = set.class(class).fields().len() as u32;
        set.fields.push(FieldEntity {
            class,
            name: decl.name,
            desc: decl.desc,
            typ: decl.typ,
            position,
            real: decl.real,
            name_obfuscated: decl.name_obfuscated,
            matched: None,
            mapped_name: None,
            tmp_name: None,
        });
        set.class_mut(class).fields.push(id);
        Ok(id)
    }

    /// Declare a method hierarchy clique explicitly.
    ///
    /// Every member's hierarchy set becomes the given list. The list should
    /// contain each member (a member is added implicitly if missing).
    pub fn link_hierarchy(&mut self, side: Side, members: &[MethodId]) -> Result<()> {
        for &m in members {
            Self::ensure_side("link hierarchy", side, m.side())?;
        }
        let set = self.side_mut(side);
        for &m in members {
            let mut hierarchy = members.to_vec();
            if !hierarchy.contains(&m) {
                hierarchy.push(m);
            }
            set.method_mut(m).hierarchy = hierarchy;
        }
        Ok(())
    }

    /// Compute method hierarchy cliques from superclass/interface edges.
    ///
    /// Methods sharing name+descriptor along supertype/subtype chains are
    /// grouped into one clique; the clique always includes the method itself.
    pub fn resolve_hierarchies(&mut self, side: Side) {
        let set = self.side_mut(side);
        let method_count = set.methods.len();
        let mut parent: Vec<u32> = (0..method_count as u32).collect();

        fn find(parent: &mut [u32], i: u32) -> u32 {
            let mut root = i;
            while parent[root as usize] != root {
                root = parent[root as usize];
            }
            let mut cur = i;
            while parent[cur as usize] != root {
                let next = parent[cur as usize];
                parent[cur as usize] = root;
                cur = next;
            }
            root
        }

        fn union(parent: &mut [u32], a: u32, b: u32) {
            let (ra, rb) = (find(parent, a), find(parent, b));
            if ra != rb {
                parent[ra as usize] = rb;
            }
        }

        for class_index in 0..set.classes.len() {
            let class = ClassId::new(side, class_index);
            for anc in Self::ancestors(set, class) {
                for &m in set.class(class).methods() {
                    let id = set.method(m).id();
                    if let Some(peer) = set.method_by_id(anc, &id) {
                        union(&mut parent, m.index() as u32, peer.index() as u32);
                    }
                }
            }
        }

        let mut cliques: IndexMap<u32, Vec<MethodId>> = IndexMap::new();
        for index in 0..method_count {
            let root = find(&mut parent, index as u32);
            cliques
                .entry(root)
                .or_default()
                .push(MethodId::new(side, index));
        }
        for members in cliques.values() {
            for &m in members {
                set.method_mut(m).hierarchy = members.clone();
            }
        }
    }

    /// Transitive supertype closure (superclasses and interfaces), excluding
    /// the class itself.
    fn ancestors(set: &EntitySet, class: ClassId) -> Vec<ClassId> {
        let mut seen = vec![false; set.classes.len()];
        let mut out = Vec::new();
        let mut stack: Vec<ClassId> = Vec::new();
        let c = set.class(class);
        stack.extend(c.superclass());
        stack.extend(c.interfaces().iter().copied());
        while let Some(cur) = stack.pop() {
            if seen[cur.index()] {
                continue;
            }
            seen[cur.index()] = true;
            out.push(cur);
            let cc = set.class(cur);
            stack.extend(cc.superclass());
            stack.extend(cc.interfaces().iter().copied());
        }
        out
    }

    // ========================================================================
    // Name surface (mapping reader/writer side)
    // ========================================================================

    pub fn class_mut(&mut self, side: Side, id: ClassId) -> &mut ClassEntity {
        self.side_mut(side).class_mut(id)
    }

    pub fn method_mut(&mut self, side: Side, id: MethodId) -> &mut MethodEntity {
        self.side_mut(side).method_mut(id)
    }

    pub fn field_mut(&mut self, side: Side, id: FieldId) -> &mut FieldEntity {
        self.side_mut(side).field_mut(id)
    }

    pub fn var_mut(&mut self, side: Side, id: VarId) -> &mut VarEntity {
        self.side_mut(side).var_mut(id)
    }

    /// Mapped name of a class: its own if set, else its peer's, else `None`.
    #[must_use]
    pub fn class_mapped_name(&self, side: Side, id: ClassId) -> Option<&str> {
        let c = self.side(side).class(id);
        if let Some(name) = c.mapped_name() {
            return Some(name);
        }
        c.matched()
            .and_then(|peer| self.side(side.opposite()).class(peer).mapped_name())
    }

    /// Mapped name of a method, resolved by lookup (own, else peer's).
    #[must_use]
    pub fn method_mapped_name(&self, side: Side, id: MethodId) -> Option<&str> {
        let m = self.side(side).method(id);
        if let Some(name) = m.mapped_name() {
            return Some(name);
        }
        m.matched()
            .and_then(|peer| self.side(side.opposite()).method(peer).mapped_name())
    }

    /// Mapped name of a field, resolved by lookup (own, else peer's).
    #[must_use]
    pub fn field_mapped_name(&self, side: Side, id: FieldId) -> Option<&str> {
        let f = self.side(side).field(id);
        if let Some(name) = f.mapped_name() {
            return Some(name);
        }
        f.matched()
            .and_then(|peer| self.side(side.opposite()).field(peer).mapped_name())
    }

    /// Mapped name of a var, resolved by lookup (own, else peer's).
    #[must_use]
    pub fn var_mapped_name(&self, side: Side, id: VarId) -> Option<&str> {
        let v = self.side(side).var(id);
        if let Some(name) = v.mapped_name() {
            return Some(name);
        }
        v.matched()
            .and_then(|peer| self.side(side.opposite()).var(peer).mapped_name())
    }

    // ========================================================================
    // Potential equality
    // ========================================================================

    /// Conservative compatibility gate for a side-A class against a side-B
    /// class: both unmatched or matched to each other, with equal array
    /// dimensions.
    #[must_use]
    pub fn classes_potentially_equal(&self, a: ClassId, b: ClassId) -> bool {
        let ca = self.a.class(a);
        let cb = self.b.class(b);
        if ca.array_dims() != cb.array_dims() {
            return false;
        }
        match (ca.matched(), cb.matched()) {
            (None, None) => true,
            (Some(peer_of_a), Some(peer_of_b)) => peer_of_a == b && peer_of_b == a,
            _ => false,
        }
    }

    /// Potential equality lifted over optional types; double absence agrees.
    #[must_use]
    pub fn opt_classes_potentially_equal(&self, a: Option<ClassId>, b: Option<ClassId>) -> bool {
        match (a, b) {
            (None, None) => true,
            (Some(a), Some(b)) => self.classes_potentially_equal(a, b),
            _ => false,
        }
    }

    /// Gate for a side-A method against a side-B method.
    #[must_use]
    pub fn methods_potentially_equal(&self, a: MethodId, b: MethodId) -> bool {
        let ma = self.a.method(a);
        let mb = self.b.method(b);
        let links_ok = match (ma.matched(), mb.matched()) {
            (None, None) => true,
            (Some(peer_of_a), Some(peer_of_b)) => peer_of_a == b && peer_of_b == a,
            _ => false,
        };
        links_ok && self.classes_potentially_equal(ma.class(), mb.class())
    }

    /// Gate for a side-A field against a side-B field.
    #[must_use]
    pub fn fields_potentially_equal(&self, a: FieldId, b: FieldId) -> bool {
        let fa = self.a.field(a);
        let fb = self.b.field(b);
        let links_ok = match (fa.matched(), fb.matched()) {
            (None, None) => true,
            (Some(peer_of_a), Some(peer_of_b)) => peer_of_a == b && peer_of_b == a,
            _ => false,
        };
        links_ok && self.classes_potentially_equal(fa.class(), fb.class())
    }

    /// Gate for a side-A var against a side-B var: same kind, compatible
    /// types.
    #[must_use]
    pub fn vars_potentially_equal(&self, a: VarId, b: VarId) -> bool {
        let va = self.a.var(a);
        let vb = self.b.var(b);
        if va.kind() != vb.kind() {
            return false;
        }
        let links_ok = match (va.matched(), vb.matched()) {
            (None, None) => true,
            (Some(peer_of_a), Some(peer_of_b)) => peer_of_a == b && peer_of_b == a,
            _ => false,
        };
        links_ok && self.opt_classes_potentially_equal(va.typ(), vb.typ())
    }

    // ========================================================================
    // Match-link mutation (arbiter only)
    // ========================================================================

    pub(crate) fn set_class_match(&mut self, side: Side, id: ClassId, peer: Option<ClassId>) {
        debug_assert!(peer.map_or(true, |p| p.side() == side.opposite()));
        self.side_mut(side).class_mut(id).set_matched(peer);
    }

    pub(crate) fn set_method_match(&mut self, side: Side, id: MethodId, peer: Option<MethodId>) {
        debug_assert!(peer.map_or(true, |p| p.side() == side.opposite()));
        self.side_mut(side).method_mut(id).set_matched(peer);
    }

    pub(crate) fn set_field_match(&mut self, side: Side, id: FieldId, peer: Option<FieldId>) {
        debug_assert!(peer.map_or(true, |p| p.side() == side.opposite()));
        self.side_mut(side).field_mut(id).set_matched(peer);
    }

    pub(crate) fn set_var_match(&mut self, side: Side, id: VarId, peer: Option<VarId>) {
        debug_assert!(peer.map_or(true, |p| p.side() == side.opposite()));
        self.side_mut(side).var_mut(id).set_matched(peer);
    }
}
