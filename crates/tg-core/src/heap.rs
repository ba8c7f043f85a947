//! The node store.
//!
//! The heap is append-only: nodes are allocated, optionally completed once
//! (`reserve` / `fill`), optionally redirected once (`install_indirection`),
//! and never freed. Every public handle stays valid for the heap's lifetime.
//!
//! Allocation is hash-consed: two `allocate` calls with the same depth and
//! payload return the same address. Callers that need a distinct identity
//! (unresolved holes, copies) use [`Heap::allocate_fresh`].
//!
//! Indirections are resolved with [`Heap::direct_addr_of`], which compresses
//! every chain it walks so repeated lookups stay O(1). The `Indirection`
//! payload keeps the originally installed target; compression only touches
//! the forwarding table.
//!
//! [`Heap::fingerprint`] hashes the graph as it currently resolves, so it
//! changes for a node and every ancestor whenever a hole below them is
//! redirected or a reserved slot is filled.

use crate::error::HeapError;
use crate::format::NodeDisplay;
use crate::types::{
    Addr, Depth, DirectAddr, Literal, Node, NodeData, NodeList, Prim, TypeAddr, VarKind,
};
use rustc_hash::{FxHashMap, FxHasher};
use std::cell::{Cell, RefCell};
use std::hash::{Hash, Hasher};
use tg_common::limits::{MAX_INDIRECTION_CHAIN, MIN_STACK_RED_ZONE, STACK_GROWTH_SIZE};
use tg_common::{Atom, NameInterner};
use tracing::trace;

pub struct Heap {
    nodes: Vec<Node>,
    /// Next hop for every node. A node forwards to itself unless it is an
    /// indirection; chains are shortened in place on lookup.
    forward: Vec<Cell<Addr>>,
    dedup: FxHashMap<(Depth, NodeData), Addr>,
    names: NameInterner,
    term_types: FxHashMap<Addr, Addr>,
    /// Fingerprints of resolved nodes; cleared whenever resolution changes.
    fingerprints: RefCell<FxHashMap<Addr, u64>>,
    type_root: TypeAddr,
    any: TypeAddr,
}

impl Heap {
    pub fn new() -> Self {
        let mut heap = Heap {
            nodes: Vec::with_capacity(256),
            forward: Vec::with_capacity(256),
            dedup: FxHashMap::default(),
            names: NameInterner::new(),
            term_types: FxHashMap::default(),
            fingerprints: RefCell::new(FxHashMap::default()),
            type_root: TypeAddr::new_unchecked(Addr(0)),
            any: TypeAddr::new_unchecked(Addr(0)),
        };

        // Type : Type
        let type_root = heap.reserve(0);
        heap.fill_unchecked(
            type_root,
            NodeData::Primitive {
                prim: Prim::Type,
                args: NodeList::from_slice(&[type_root]),
            },
        );
        heap.type_root = TypeAddr::new_unchecked(type_root);
        heap.any = TypeAddr::new_unchecked(heap.prim(0, Prim::Any, &[]));
        heap
    }

    // =========================================================================
    // Allocation
    // =========================================================================

    /// Allocate a node, returning an existing address when an identical node
    /// (same depth, same payload) already exists.
    pub fn allocate(&mut self, depth: Depth, data: NodeData) -> Addr {
        if matches!(data, NodeData::Pending | NodeData::Indirection(_)) {
            return self.allocate_fresh(depth, data);
        }
        let key = (depth, data);
        if let Some(&addr) = self.dedup.get(&key) {
            return addr;
        }
        let (depth, data) = key;
        let addr = self.push(depth, data.clone());
        self.dedup.insert((depth, data), addr);
        addr
    }

    /// Allocate a node with a new identity, bypassing deduplication.
    pub fn allocate_fresh(&mut self, depth: Depth, data: NodeData) -> Addr {
        self.push(depth, data)
    }

    /// Reserve a slot to be completed later with [`Heap::fill`]. The slot may
    /// be referenced by other nodes before it is filled, which is how cyclic
    /// structure is built.
    pub fn reserve(&mut self, depth: Depth) -> Addr {
        self.push(depth, NodeData::Pending)
    }

    /// Complete a reserved slot. Filling with an `Indirection` installs it.
    pub fn fill(&mut self, addr: Addr, data: NodeData) -> Result<(), HeapError> {
        self.check_addr(addr)?;
        if !matches!(self.nodes[addr.index()].data, NodeData::Pending) {
            return Err(HeapError::NotPending { addr });
        }
        if let NodeData::Indirection(target) = data {
            return self.install_indirection(addr, target);
        }
        self.fill_unchecked(addr, data);
        Ok(())
    }

    pub(crate) fn fill_unchecked(&mut self, addr: Addr, data: NodeData) {
        let depth = self.nodes[addr.index()].depth;
        self.nodes[addr.index()].data = data.clone();
        self.dedup.entry((depth, data)).or_insert(addr);
        self.fingerprints.get_mut().clear();
    }

    fn push(&mut self, depth: Depth, data: NodeData) -> Addr {
        let addr = Addr(self.nodes.len() as u32);
        let next = match data {
            NodeData::Indirection(target) => target,
            _ => addr,
        };
        self.nodes.push(Node { depth, data });
        self.forward.push(Cell::new(next));
        addr
    }

    // =========================================================================
    // Indirections
    // =========================================================================

    /// Follow indirections to a resolved node.
    ///
    /// # Panics
    /// On an unknown address or a chain that does not resolve; both are
    /// defects in the caller. Use [`Heap::try_direct_addr_of`] to report
    /// them instead.
    pub fn direct_addr_of(&self, addr: Addr) -> DirectAddr {
        match self.try_direct_addr_of(addr) {
            Ok(direct) => direct,
            Err(err) => panic!("direct_addr_of({addr}): {err}"),
        }
    }

    pub fn try_direct_addr_of(&self, addr: Addr) -> Result<DirectAddr, HeapError> {
        self.check_addr(addr)?;

        let mut root = addr;
        let mut steps = 0u32;
        loop {
            let next = self.forward[root.index()].get();
            if next == root {
                break;
            }
            steps += 1;
            if steps > MAX_INDIRECTION_CHAIN {
                return Err(HeapError::UnresolvedIndirection { addr, steps });
            }
            root = next;
        }

        // Path compression.
        let mut cur = addr;
        while cur != root {
            let next = self.forward[cur.index()].get();
            self.forward[cur.index()].set(root);
            cur = next;
        }

        Ok(DirectAddr(root))
    }

    /// Redirect `addr` to `target` permanently.
    ///
    /// Installing the same resolution twice is a no-op; redirecting an
    /// already-redirected node elsewhere is an error.
    pub fn install_indirection(&mut self, addr: Addr, target: Addr) -> Result<(), HeapError> {
        self.check_addr(addr)?;
        let root = self.try_direct_addr_of(target)?.addr();

        if let NodeData::Indirection(_) = self.nodes[addr.index()].data {
            let existing = self.try_direct_addr_of(addr)?.addr();
            if existing == root {
                return Ok(());
            }
            return Err(HeapError::IndirectionConflict {
                addr,
                existing,
                requested: root,
            });
        }
        if root == addr {
            return Err(HeapError::SelfIndirection { addr });
        }

        let node = &self.nodes[addr.index()];
        let key = (node.depth, node.data.clone());
        if self.dedup.get(&key) == Some(&addr) {
            self.dedup.remove(&key);
        }

        trace!(%addr, %target, %root, "install_indirection");
        self.nodes[addr.index()].data = NodeData::Indirection(target);
        self.forward[addr.index()].set(root);
        self.fingerprints.get_mut().clear();
        Ok(())
    }

    // =========================================================================
    // Fingerprints
    // =========================================================================

    /// Deep structural hash of the graph reachable from `addr`, taken through
    /// indirections.
    ///
    /// Stable across runs for identically built graphs, since names are hashed
    /// by their text rather than their atom, and independent of where nodes
    /// sit in the heap. Distinct holes with the same depth hash alike.
    pub fn fingerprint(&self, addr: Addr) -> u64 {
        let direct = self.direct_addr_of(addr).addr();
        if let Some(&cached) = self.fingerprints.borrow().get(&direct) {
            return cached;
        }
        let mut walk = FingerprintWalk {
            heap: self,
            path: FxHashMap::default(),
        };
        walk.visit(direct).0
    }

    fn hash_head(&self, addr: Addr, node: &Node, hasher: &mut FxHasher) {
        node.depth.hash(hasher);
        node.data.kind_name().hash(hasher);
        match &node.data {
            NodeData::Primitive { prim, .. } => match prim {
                Prim::Named(atom) => self.names.resolve(*atom).hash(hasher),
                other => other.symbol().hash(hasher),
            },
            NodeData::Literal(Literal::Int(value)) => value.hash(hasher),
            NodeData::Literal(Literal::Str(atom)) => self.names.resolve(*atom).hash(hasher),
            // Unfilled slots have no structure yet; only identity tells them apart.
            NodeData::Pending => addr.hash(hasher),
            _ => {}
        }
    }

    // =========================================================================
    // Queries
    // =========================================================================

    fn check_addr(&self, addr: Addr) -> Result<(), HeapError> {
        if addr.index() < self.nodes.len() {
            Ok(())
        } else {
            Err(HeapError::UnknownAddr { addr })
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn contains(&self, addr: Addr) -> bool {
        addr.index() < self.nodes.len()
    }

    /// The node stored at `addr` itself, which may be an indirection.
    #[inline]
    pub fn node(&self, addr: Addr) -> &Node {
        &self.nodes[addr.index()]
    }

    pub fn try_node(&self, addr: Addr) -> Result<&Node, HeapError> {
        self.check_addr(addr)?;
        Ok(&self.nodes[addr.index()])
    }

    #[inline]
    pub fn data(&self, addr: Addr) -> &NodeData {
        &self.nodes[addr.index()].data
    }

    #[inline]
    pub fn depth(&self, addr: Addr) -> Depth {
        self.nodes[addr.index()].depth
    }

    /// The resolved node behind `addr`.
    #[inline]
    pub fn direct_node(&self, addr: Addr) -> &Node {
        self.node(self.direct_addr_of(addr).addr())
    }

    #[inline]
    pub fn type_root(&self) -> TypeAddr {
        self.type_root
    }

    #[inline]
    pub fn any(&self) -> TypeAddr {
        self.any
    }

    pub fn is_prim(&self, addr: Addr, prim: Prim) -> bool {
        matches!(
            self.direct_node(addr).data.as_primitive(),
            Some((found, _)) if found == prim
        )
    }

    pub fn display(&self, addr: Addr) -> NodeDisplay<'_> {
        NodeDisplay::new(self, addr)
    }

    // =========================================================================
    // Names and term types
    // =========================================================================

    pub fn intern(&mut self, name: &str) -> Atom {
        self.names.intern(name)
    }

    pub fn name_of(&self, atom: Atom) -> &str {
        self.names.resolve(atom)
    }

    pub fn names(&self) -> &NameInterner {
        &self.names
    }

    /// Record the type of a term node.
    pub fn annotate(&mut self, term: Addr, ty: Addr) {
        self.term_types.insert(term, ty);
    }

    /// The recorded type of `term`, or the carried type of an `Opaque` term.
    pub fn type_of(&self, term: Addr) -> Option<Addr> {
        if let Some(&ty) = self.term_types.get(&term) {
            return Some(ty);
        }
        match &self.direct_node(term).data {
            NodeData::Opaque { ty } => Some(*ty),
            _ => self
                .term_types
                .get(&self.direct_addr_of(term).addr())
                .copied(),
        }
    }

    // =========================================================================
    // Constructors
    // =========================================================================

    pub fn tm_var(&mut self, depth: Depth) -> Addr {
        self.allocate(depth, NodeData::TmVar)
    }

    pub fn ty_var(&mut self, depth: Depth) -> TypeAddr {
        TypeAddr::new_unchecked(self.allocate(depth, NodeData::TyVar))
    }

    pub fn var(&mut self, kind: VarKind, depth: Depth) -> Addr {
        match kind {
            VarKind::Term => self.tm_var(depth),
            VarKind::Type => self.ty_var(depth).addr(),
        }
    }

    pub fn tm_lambda(&mut self, depth: Depth, pattern: Addr, body: Addr) -> Addr {
        self.allocate(depth, NodeData::TmLambda { pattern, body })
    }

    pub fn ty_fun(&mut self, depth: Depth, domain: Addr, codomain: Addr) -> TypeAddr {
        TypeAddr::new_unchecked(self.allocate(depth, NodeData::TyFun { domain, codomain }))
    }

    /// `(x : domain) -> build(x)`, with `x` bound one level below `depth`.
    pub fn ty_fun_with(
        &mut self,
        depth: Depth,
        domain: Addr,
        build: impl FnOnce(&mut Heap, Addr) -> Addr,
    ) -> TypeAddr {
        let x = self.tm_var(depth + 1);
        let codomain = build(self, x);
        self.ty_fun(depth, domain, codomain)
    }

    pub fn prim(&mut self, depth: Depth, prim: Prim, args: &[Addr]) -> Addr {
        self.allocate(
            depth,
            NodeData::Primitive {
                prim,
                args: NodeList::from_slice(args),
            },
        )
    }

    pub fn named(&mut self, depth: Depth, name: &str, args: &[Addr]) -> TypeAddr {
        let atom = self.names.intern(name);
        TypeAddr::new_unchecked(self.prim(depth, Prim::Named(atom), args))
    }

    pub fn union(&mut self, depth: Depth, a: Addr, b: Addr) -> TypeAddr {
        TypeAddr::new_unchecked(self.prim(depth, Prim::Union, &[a, b]))
    }

    pub fn intersection(&mut self, depth: Depth, a: Addr, b: Addr) -> TypeAddr {
        TypeAddr::new_unchecked(self.prim(depth, Prim::Intersection, &[a, b]))
    }

    /// `{<:}(sub, sup)`
    pub fn sub_bound(&mut self, depth: Depth, sub: Addr, sup: Addr) -> TypeAddr {
        TypeAddr::new_unchecked(self.prim(depth, Prim::Sub, &[sub, sup]))
    }

    /// `{:>}(sup, sub)`
    pub fn super_bound(&mut self, depth: Depth, sup: Addr, sub: Addr) -> TypeAddr {
        TypeAddr::new_unchecked(self.prim(depth, Prim::Super, &[sup, sub]))
    }

    /// `Self(λself. build(self))`
    pub fn self_ty(
        &mut self,
        depth: Depth,
        build: impl FnOnce(&mut Heap, Addr) -> Addr,
    ) -> TypeAddr {
        let this = self.tm_var(depth + 1);
        let body = build(self, this);
        let lambda = self.tm_lambda(depth, this, body);
        TypeAddr::new_unchecked(self.prim(depth, Prim::SelfTy, &[lambda]))
    }

    /// `Fix(λrec. build(rec))`
    pub fn fix(&mut self, depth: Depth, build: impl FnOnce(&mut Heap, Addr) -> Addr) -> TypeAddr {
        let rec = self.ty_var(depth + 1).addr();
        let body = build(self, rec);
        let lambda = self.tm_lambda(depth, rec, body);
        TypeAddr::new_unchecked(self.prim(depth, Prim::Fix, &[lambda]))
    }

    /// A fresh unresolved hole; never shared with another hole.
    pub fn unknown(&mut self, depth: Depth) -> TypeAddr {
        TypeAddr::new_unchecked(self.allocate_fresh(
            depth,
            NodeData::Primitive {
                prim: Prim::Unknown,
                args: NodeList::new(),
            },
        ))
    }

    pub fn tm_pair(&mut self, depth: Depth, first: Addr, second: Addr) -> Addr {
        self.allocate(depth, NodeData::TmPair { first, second })
    }

    pub fn tm_app(&mut self, depth: Depth, func: Addr, arg: Addr) -> Addr {
        self.allocate(depth, NodeData::TmApp { func, arg })
    }

    pub fn lit_int(&mut self, depth: Depth, value: i64) -> Addr {
        self.allocate(depth, NodeData::Literal(Literal::Int(value)))
    }

    pub fn lit_str(&mut self, depth: Depth, value: &str) -> Addr {
        let atom = self.names.intern(value);
        self.allocate(depth, NodeData::Literal(Literal::Str(atom)))
    }

    /// An unknown term of type `ty`.
    pub fn opaque(&mut self, depth: Depth, ty: Addr) -> Addr {
        self.allocate(depth, NodeData::Opaque { ty })
    }
}

impl Default for Heap {
    fn default() -> Self {
        Heap::new()
    }
}

/// Post-order hashing walk. A node re-entered on the current path hashes as
/// its distance up the path; results that lean on such a back edge from
/// above the node are entry-dependent and are not cached.
struct FingerprintWalk<'a> {
    heap: &'a Heap,
    path: FxHashMap<Addr, usize>,
}

impl FingerprintWalk<'_> {
    /// Returns the fingerprint and the shallowest path index it refers to.
    fn visit(&mut self, addr: Addr) -> (u64, usize) {
        stacker::maybe_grow(MIN_STACK_RED_ZONE, STACK_GROWTH_SIZE, || self.visit_inner(addr))
    }

    fn visit_inner(&mut self, addr: Addr) -> (u64, usize) {
        let heap = self.heap;
        let direct = heap.direct_addr_of(addr).addr();
        if let Some(&cached) = heap.fingerprints.borrow().get(&direct) {
            return (cached, usize::MAX);
        }
        if let Some(&index) = self.path.get(&direct) {
            let mut hasher = FxHasher::default();
            "cycle".hash(&mut hasher);
            (self.path.len() - index).hash(&mut hasher);
            return (hasher.finish(), index);
        }

        let index = self.path.len();
        self.path.insert(direct, index);
        let node = heap.node(direct);
        let mut hasher = FxHasher::default();
        heap.hash_head(direct, node, &mut hasher);
        let mut lowest = usize::MAX;
        for (child, _) in node.data.children() {
            let (fingerprint, reach) = self.visit(child);
            fingerprint.hash(&mut hasher);
            lowest = lowest.min(reach);
        }
        self.path.remove(&direct);

        let fingerprint = hasher.finish();
        if lowest >= index {
            heap.fingerprints.borrow_mut().insert(direct, fingerprint);
            lowest = usize::MAX;
        }
        (fingerprint, lowest)
    }
}
