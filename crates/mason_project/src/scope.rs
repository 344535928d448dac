//! Scope arena and enumeration id reservation.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use crate::directive::Directive;
use crate::enumeration::Enumeration;

/// Index of a [`Scope`] within its [`DirectiveTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ScopeId(pub(crate) u32);

impl ScopeId {
    /// The position of this scope in the arena.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A container of ordered directives.
///
/// Transparent scopes (created by imports) share enumeration id
/// reservations with their parent; opaque scopes (the root and every
/// selector branch) absorb them.
#[derive(Debug)]
pub struct Scope {
    /// Enclosing scope; `None` only for the root.
    pub parent: Option<ScopeId>,
    /// Directory relative paths in this scope were resolved against.
    pub directory: PathBuf,
    /// Whether enumeration reservations propagate past this scope.
    pub transparent: bool,
    /// Directives in declaration order.
    pub directives: Vec<Directive>,
    /// Enumeration ids reserved here.
    pub reserved_enumeration_ids: BTreeSet<String>,
}

/// Arena of scopes rooted at a single opaque scope.
#[derive(Debug)]
pub struct DirectiveTree {
    scopes: Vec<Scope>,
}

impl DirectiveTree {
    /// Creates a tree holding only an empty, opaque root scope.
    pub fn new(root_directory: &Path) -> Self {
        Self {
            scopes: vec![Scope {
                parent: None,
                directory: root_directory.to_path_buf(),
                transparent: false,
                directives: Vec::new(),
                reserved_enumeration_ids: BTreeSet::new(),
            }],
        }
    }

    /// The root scope.
    pub fn root(&self) -> ScopeId {
        ScopeId(0)
    }

    /// Returns the scope with the given id.
    ///
    /// # Panics
    ///
    /// Panics if `id` was not produced by this tree.
    pub fn scope(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.index()]
    }

    /// Number of scopes in the arena.
    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    /// Always `false`: the root scope exists from construction.
    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }

    /// Adds an empty child scope of `parent`.
    ///
    /// The child is not referenced by any directive yet; the caller links it
    /// through an `Import` or selector directive.
    pub fn add_scope(&mut self, parent: ScopeId, directory: &Path, transparent: bool) -> ScopeId {
        let id = ScopeId(self.scopes.len() as u32);
        self.scopes.push(Scope {
            parent: Some(parent),
            directory: directory.to_path_buf(),
            transparent,
            directives: Vec::new(),
            reserved_enumeration_ids: BTreeSet::new(),
        });
        id
    }

    /// Appends `directive` to `scope`.
    pub fn add_directive(&mut self, scope: ScopeId, directive: Directive) {
        self.scopes[scope.index()].directives.push(directive);
    }

    /// Iterates `scope` and its ancestors, innermost first.
    pub fn ancestors(&self, scope: ScopeId) -> impl Iterator<Item = ScopeId> + '_ {
        std::iter::successors(Some(scope), move |id| self.scope(*id).parent)
    }

    /// Reserves an enumeration id in `scope`.
    ///
    /// Fails (returns `false`) if the id is already reserved anywhere in the
    /// ancestor chain. Otherwise the id is recorded in `scope` and in each
    /// ancestor up to and including the first opaque one.
    pub fn reserve_enumeration_id(&mut self, scope: ScopeId, id: &str) -> bool {
        if self.is_enumeration_reserved(scope, id) {
            return false;
        }

        let mut current = Some(scope);
        while let Some(index) = current {
            let entry = &mut self.scopes[index.index()];
            entry.reserved_enumeration_ids.insert(id.to_string());
            if !entry.transparent {
                break;
            }
            current = entry.parent;
        }
        true
    }

    /// Returns `true` if `id` is reserved in `scope` or any ancestor.
    pub fn is_enumeration_reserved(&self, scope: ScopeId, id: &str) -> bool {
        self.ancestors(scope)
            .any(|s| self.scope(s).reserved_enumeration_ids.contains(id))
    }

    /// Finds the declaration of enumeration `id` visible from `scope`.
    ///
    /// A declaration is visible when the scopes its reservation reached
    /// intersect the ancestor chain of `scope`.
    pub fn visible_enumeration(&self, scope: ScopeId, id: &str) -> Option<&Enumeration> {
        if !self.is_enumeration_reserved(scope, id) {
            return None;
        }
        let chain: BTreeSet<ScopeId> = self.ancestors(scope).collect();

        self.scopes.iter().enumerate().find_map(|(index, declaring)| {
            let enumeration = declaring.directives.iter().find_map(|d| match d {
                Directive::Enumeration(e) if e.id == id => Some(e),
                _ => None,
            })?;
            self.reservation_reach(ScopeId(index as u32))
                .any(|s| chain.contains(&s))
                .then_some(enumeration)
        })
    }

    /// The scopes a reservation made in `scope` was recorded in.
    fn reservation_reach(&self, scope: ScopeId) -> impl Iterator<Item = ScopeId> + '_ {
        let mut done = false;
        self.ancestors(scope).take_while(move |s| {
            if done {
                return false;
            }
            done = !self.scope(*s).transparent;
            true
        })
    }
}
