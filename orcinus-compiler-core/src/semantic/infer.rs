// Type inference for Orcinus
//
// Hindley-Milner unification specialized to call sites: generic parameters
// become inference variables, parameter and argument types lift into
// constructor terms, and unification binds each variable to a concrete
// type. Terms form a union-find forest; `prune` is the path compression.

use super::symbol::{SymbolTable, TypeId};
use crate::source::Location;
use std::collections::HashMap;
use thiserror::Error;

/// Identifier of an inference term inside one `Inference` session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TermId(u32);

#[derive(Debug)]
enum Term {
    /// A type variable, optionally bound to another term
    Var {
        name: String,
        instance: Option<TermId>,
        location: Location,
    },
    /// A type constructor applied to argument terms
    Ctor {
        constructor: TypeId,
        arguments: Vec<TermId>,
    },
}

/// Unification failure; callers reject the overload candidate
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum InferError {
    #[error("recursive unification")]
    Occurs,
    #[error("type mismatch: {0} != {1}")]
    Mismatch(String, String),
}

/// The concrete shape of a solved term
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Concrete {
    Plain(TypeId),
    /// A generic constructor applied to concrete arguments; the caller
    /// instantiates it through the module's instance cache
    Apply(TypeId, Vec<Concrete>),
}

/// One inference session (one overload candidate check)
#[derive(Debug, Default)]
pub struct Inference {
    terms: Vec<Term>,
    memo: HashMap<TypeId, TermId>,
}

impl Inference {
    pub fn new() -> Self {
        Self::default()
    }

    fn alloc(&mut self, term: Term) -> TermId {
        let id = TermId(self.terms.len() as u32);
        self.terms.push(term);
        id
    }

    /// Introduce a fresh variable for a generic parameter placeholder
    pub fn add_generic_parameter(&mut self, param: TypeId, symbols: &SymbolTable) -> TermId {
        let data = symbols.ty(param);
        let var = self.alloc(Term::Var {
            name: data.name.clone(),
            instance: None,
            location: data.location.clone(),
        });
        self.memo.insert(param, var);
        var
    }

    /// Lift a type symbol into a term, recursively through generic arguments
    pub fn add_type(&mut self, ty: TypeId, symbols: &SymbolTable) -> TermId {
        if let Some(&term) = self.memo.get(&ty) {
            return term;
        }

        let data = symbols.ty(ty);
        let term = if !data.generic_arguments.is_empty() {
            let constructor = data.definition.unwrap_or(ty);
            let arguments = data
                .generic_arguments
                .clone()
                .into_iter()
                .map(|arg| self.add_type(arg, symbols))
                .collect();
            Term::Ctor {
                constructor,
                arguments,
            }
        } else {
            Term::Ctor {
                constructor: ty,
                arguments: Vec::new(),
            }
        };

        let id = self.alloc(term);
        self.memo.insert(ty, id);
        id
    }

    /// Compress Var chains to their representative
    pub fn prune(&mut self, term: TermId) -> TermId {
        let bound = match &self.terms[term.0 as usize] {
            Term::Var {
                instance: Some(instance),
                ..
            } => *instance,
            _ => return term,
        };
        let root = self.prune(bound);
        if let Term::Var { instance, .. } = &mut self.terms[term.0 as usize] {
            *instance = Some(root);
        }
        root
    }

    /// Occurs check: does variable `var` appear inside `term`?
    fn occurs_in(&mut self, var: TermId, term: TermId) -> bool {
        let pruned = self.prune(term);
        if pruned == var {
            return true;
        }
        if let Term::Ctor { arguments, .. } = &self.terms[pruned.0 as usize] {
            let arguments = arguments.clone();
            return arguments.iter().any(|&arg| self.occurs_in(var, arg));
        }
        false
    }

    /// Make two terms the same, binding variables as needed
    pub fn unify(
        &mut self,
        left: TermId,
        right: TermId,
        symbols: &SymbolTable,
    ) -> Result<(), InferError> {
        let left = self.prune(left);
        let right = self.prune(right);

        if matches!(self.terms[left.0 as usize], Term::Var { .. }) {
            if left != right {
                if self.occurs_in(left, right) {
                    return Err(InferError::Occurs);
                }
                if let Term::Var { instance, .. } = &mut self.terms[left.0 as usize] {
                    *instance = Some(right);
                }
            }
            return Ok(());
        }
        if matches!(self.terms[right.0 as usize], Term::Var { .. }) {
            return self.unify(right, left, symbols);
        }

        let (ctor_left, args_left) = match &self.terms[left.0 as usize] {
            Term::Ctor {
                constructor,
                arguments,
            } => (*constructor, arguments.clone()),
            Term::Var { .. } => unreachable!(),
        };
        let (ctor_right, args_right) = match &self.terms[right.0 as usize] {
            Term::Ctor {
                constructor,
                arguments,
            } => (*constructor, arguments.clone()),
            Term::Var { .. } => unreachable!(),
        };

        if ctor_left != ctor_right || args_left.len() != args_right.len() {
            return Err(InferError::Mismatch(
                self.display(left, symbols),
                self.display(right, symbols),
            ));
        }
        for (a, b) in args_left.into_iter().zip(args_right) {
            self.unify(a, b, symbols)?;
        }
        Ok(())
    }

    /// The concrete shape a term settled on, if fully bound
    pub fn concrete(&mut self, term: TermId) -> Option<Concrete> {
        let pruned = self.prune(term);
        match &self.terms[pruned.0 as usize] {
            Term::Var { .. } => None,
            Term::Ctor {
                constructor,
                arguments,
            } => {
                let constructor = *constructor;
                if arguments.is_empty() {
                    return Some(Concrete::Plain(constructor));
                }
                let arguments = arguments.clone();
                let mut resolved = Vec::with_capacity(arguments.len());
                for arg in arguments {
                    resolved.push(self.concrete(arg)?);
                }
                Some(Concrete::Apply(constructor, resolved))
            }
        }
    }

    fn display(&self, term: TermId, symbols: &SymbolTable) -> String {
        match &self.terms[term.0 as usize] {
            Term::Var {
                name,
                instance: None,
                ..
            } => name.clone(),
            Term::Var {
                instance: Some(instance),
                ..
            } => self.display(*instance, symbols),
            Term::Ctor {
                constructor,
                arguments,
            } => {
                if arguments.is_empty() {
                    symbols.type_display(*constructor)
                } else {
                    let args = arguments
                        .iter()
                        .map(|&a| self.display(a, symbols))
                        .collect::<Vec<_>>()
                        .join(", ");
                    format!("{}[{}]", symbols.ty(*constructor).name, args)
                }
            }
        }
    }
}
