//! Named type capabilities and the registry of their instances.
//!
//! The registry is assembled once through [`TraitRegistryBuilder`] and is
//! immutable afterwards, so one frozen registry can be shared by any number
//! of inference sessions.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use once_cell::sync::Lazy;

use crate::{Type, TypeTag};

/// Operand types of `+`.
pub const ADDABLE: &str = "Addable";
/// Operand types of `-`, `*` and `/`.
pub const ARITHMETIC: &str = "Arithmetic";
/// Operand types of `<`, `>`, `<=` and `>=`.
pub const COMPARABLE: &str = "Comparable";
/// Operand types of `==` and `!=`.
pub const EQUATABLE: &str = "Equatable";

static NEXT_REGISTRY_VERSION: AtomicU32 = AtomicU32::new(1);

static BUILTIN: Lazy<Arc<TraitRegistry>> = Lazy::new(|| Arc::new(builtin_registry()));

fn builtin_registry() -> TraitRegistry {
    let seed: [(&str, &[TypeTag]); 4] = [
        (ADDABLE, &[TypeTag::Num, TypeTag::Str]),
        (ARITHMETIC, &[TypeTag::Num]),
        (COMPARABLE, &[TypeTag::Num, TypeTag::Str]),
        (
            EQUATABLE,
            &[
                TypeTag::Int,
                TypeTag::Num,
                TypeTag::Bool,
                TypeTag::Str,
                TypeTag::None,
            ],
        ),
    ];

    let mut builder = TraitRegistryBuilder::new();
    for (name, instances) in seed {
        builder
            .declare_trait(name)
            .expect("builtin trait names are distinct");
        for tag in instances {
            builder
                .register_instance(name, *tag)
                .expect("builtin trait was just declared");
        }
    }
    builder.build()
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("trait `{0}` is already registered")]
    DuplicateTrait(String),
    #[error("trait `{0}` is not registered")]
    UnknownTrait(String),
}

/// A named capability and the type tags that implement it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeTrait {
    name: String,
    instances: BTreeSet<TypeTag>,
}

impl TypeTrait {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            instances: BTreeSet::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn add_instance(&mut self, tag: TypeTag) {
        self.instances.insert(tag);
    }

    pub fn has_instance(&self, tag: TypeTag) -> bool {
        self.instances.contains(&tag)
    }

    pub fn instances(&self) -> &BTreeSet<TypeTag> {
        &self.instances
    }
}

/// Append-only construction of a [`TraitRegistry`].
#[derive(Debug, Default)]
pub struct TraitRegistryBuilder {
    traits: BTreeMap<String, TypeTrait>,
}

impl TraitRegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn declare_trait(&mut self, name: &str) -> Result<&mut Self, RegistryError> {
        if self.traits.contains_key(name) {
            return Err(RegistryError::DuplicateTrait(name.to_string()));
        }
        self.traits.insert(name.to_string(), TypeTrait::new(name));
        Ok(self)
    }

    /// Record that values tagged `tag` satisfy `trait_name`.
    pub fn register_instance(
        &mut self,
        trait_name: &str,
        tag: TypeTag,
    ) -> Result<&mut Self, RegistryError> {
        let entry = self
            .traits
            .get_mut(trait_name)
            .ok_or_else(|| RegistryError::UnknownTrait(trait_name.to_string()))?;
        entry.add_instance(tag);
        Ok(self)
    }

    /// Freeze the registry.
    pub fn build(self) -> TraitRegistry {
        let version = NEXT_REGISTRY_VERSION.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(version, traits = self.traits.len(), "trait registry frozen");
        TraitRegistry {
            traits: self.traits,
            version,
        }
    }
}

/// Frozen set of traits and their instances.
#[derive(Debug, Clone)]
pub struct TraitRegistry {
    traits: BTreeMap<String, TypeTrait>,
    version: u32,
}

impl TraitRegistry {
    /// The process-wide registry of built-in traits, created on first use.
    pub fn builtin() -> Arc<TraitRegistry> {
        Arc::clone(&BUILTIN)
    }

    /// Identifies this frozen registry. Distinct registries never share a version.
    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn contains(&self, trait_name: &str) -> bool {
        self.traits.contains_key(trait_name)
    }

    pub fn get(&self, trait_name: &str) -> Option<&TypeTrait> {
        self.traits.get(trait_name)
    }

    pub fn trait_names(&self) -> impl Iterator<Item = &str> {
        self.traits.keys().map(String::as_str)
    }

    pub fn instances(&self, trait_name: &str) -> Option<&BTreeSet<TypeTag>> {
        self.traits.get(trait_name).map(TypeTrait::instances)
    }

    /// Checked form of [`TraitRegistry::satisfies`].
    ///
    /// `Const` types answer for their wrapped type. Variables satisfy
    /// nothing; callers resolve them first.
    pub fn try_satisfies(&self, ty: &Type, trait_name: &str) -> Result<bool, RegistryError> {
        let entry = self
            .traits
            .get(trait_name)
            .ok_or_else(|| RegistryError::UnknownTrait(trait_name.to_string()))?;
        Ok(entry.has_instance(ty.widen().tag()))
    }

    /// Does `ty` satisfy `trait_name`?
    ///
    /// # Panics
    ///
    /// Traits are a closed, compile-time-known set; asking about one that was
    /// never registered is a checker bug.
    pub fn satisfies(&self, ty: &Type, trait_name: &str) -> bool {
        match self.try_satisfies(ty, trait_name) {
            Ok(result) => result,
            Err(err) => panic!("{err}"),
        }
    }

    /// Names of every trait `ty` satisfies.
    pub fn traits_of(&self, ty: &Type) -> BTreeSet<&str> {
        let tag = ty.widen().tag();
        self.traits
            .values()
            .filter(|t| t.has_instance(tag))
            .map(TypeTrait::name)
            .collect()
    }
}
