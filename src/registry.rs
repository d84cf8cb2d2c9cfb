//! Process-wide validator registries.
//!
//! Five independently-locked maps with process lifetime: custom
//! validators, context-aware validators, struct-level validators (keyed
//! by type identity), tag aliases, and the optional field-naming
//! override. Each registry takes its own `RwLock`, so readers of one are
//! never serialized behind writers of another.
//!
//! Plans resolve custom validators by name at validation time, so a
//! registration after a validator was built is picked up immediately and
//! stale bindings cannot exist. Derived-schema caches are the one thing
//! that can go stale; every mutation here bumps a global epoch that
//! those caches compare against.

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock, RwLock};

use serde_json::{Map, Value};

use crate::constraint;
use crate::context::Context;
use crate::error::{ConfigError, ValidationErrors};

/// A named custom validator: receives the field value and the directive
/// parameter, returns `Err(message)` to reject.
pub type CustomFn = Arc<dyn Fn(&Value, Option<&str>) -> Result<(), String> + Send + Sync>;

/// A context-aware validator: additionally receives the caller's
/// [`Context`] and is responsible for observing cancellation itself.
pub type ContextFn =
    Arc<dyn Fn(&Context, &Value, Option<&str>) -> Result<(), String> + Send + Sync>;

/// A struct-level validator: sees the whole record (as its serialized
/// object form) and pushes any number of violations into the collector.
pub type StructFn = Arc<dyn Fn(&Map<String, Value>, &mut ValidationErrors) + Send + Sync>;

/// The field-naming override applied when resolving wire names.
pub type NameFn = Arc<dyn Fn(&str) -> String + Send + Sync>;

pub(crate) struct StructEntry {
    pub name: String,
    pub run: StructFn,
}

static EPOCH: AtomicU64 = AtomicU64::new(0);

fn bump_epoch() {
    EPOCH.fetch_add(1, Ordering::Release);
}

/// Monotonic counter incremented on every registry mutation. Schema
/// caches record the epoch they were computed at and recompute when it
/// has moved.
pub(crate) fn epoch() -> u64 {
    EPOCH.load(Ordering::Acquire)
}

fn custom_registry() -> &'static RwLock<HashMap<String, CustomFn>> {
    static REG: OnceLock<RwLock<HashMap<String, CustomFn>>> = OnceLock::new();
    REG.get_or_init(Default::default)
}

fn context_registry() -> &'static RwLock<HashMap<String, ContextFn>> {
    static REG: OnceLock<RwLock<HashMap<String, ContextFn>>> = OnceLock::new();
    REG.get_or_init(Default::default)
}

fn struct_registry() -> &'static RwLock<HashMap<TypeId, Arc<StructEntry>>> {
    static REG: OnceLock<RwLock<HashMap<TypeId, Arc<StructEntry>>>> = OnceLock::new();
    REG.get_or_init(Default::default)
}

fn alias_registry() -> &'static RwLock<HashMap<String, String>> {
    static REG: OnceLock<RwLock<HashMap<String, String>>> = OnceLock::new();
    REG.get_or_init(Default::default)
}

fn name_fn_slot() -> &'static RwLock<Option<NameFn>> {
    static SLOT: OnceLock<RwLock<Option<NameFn>>> = OnceLock::new();
    SLOT.get_or_init(Default::default)
}

fn check_name(name: &str) -> Result<(), ConfigError> {
    if name.is_empty() {
        return Err(ConfigError::EmptyName);
    }
    if constraint::is_reserved(name) {
        return Err(ConfigError::ReservedName {
            name: name.to_string(),
        });
    }
    Ok(())
}

/// Register a custom validator under a tag directive name.
///
/// Fails when the name is empty or collides with a built-in directive.
/// Re-registering an existing name replaces it; plans reference custom
/// validators by name and resolve them per call, so already-built
/// validators see the new function on their next run.
pub fn register_validator<F>(name: &str, f: F) -> Result<(), ConfigError>
where
    F: Fn(&Value, Option<&str>) -> Result<(), String> + Send + Sync + 'static,
{
    check_name(name)?;
    custom_registry()
        .write()
        .expect("custom validator registry poisoned")
        .insert(name.to_string(), Arc::new(f));
    bump_epoch();
    Ok(())
}

/// Register a context-aware validator under a tag directive name.
pub fn register_context_validator<F>(name: &str, f: F) -> Result<(), ConfigError>
where
    F: Fn(&Context, &Value, Option<&str>) -> Result<(), String> + Send + Sync + 'static,
{
    check_name(name)?;
    context_registry()
        .write()
        .expect("context validator registry poisoned")
        .insert(name.to_string(), Arc::new(f));
    bump_epoch();
    Ok(())
}

/// Register a whole-record validator for type `T`.
///
/// Runs after all field constraints of a `T` plan, with its violations
/// merged into the same aggregated list under the short type name.
/// Re-registering for the same type replaces the previous function.
pub fn register_struct_validator<T, F>(f: F)
where
    T: 'static,
    F: Fn(&Map<String, Value>, &mut ValidationErrors) + Send + Sync + 'static,
{
    let entry = Arc::new(StructEntry {
        name: short_type_name::<T>().to_string(),
        run: Arc::new(f),
    });
    struct_registry()
        .write()
        .expect("struct validator registry poisoned")
        .insert(TypeId::of::<T>(), entry);
    bump_epoch();
}

/// Register a tag alias: wherever `name` appears in a tag, `expansion`
/// is spliced in and parsed in its place. Expansions are applied once;
/// an alias inside an expansion is not expanded again.
pub fn register_alias(name: &str, expansion: &str) -> Result<(), ConfigError> {
    check_name(name)?;
    alias_registry()
        .write()
        .expect("alias registry poisoned")
        .insert(name.to_string(), expansion.to_string());
    bump_epoch();
    Ok(())
}

/// Install the process-wide field-naming override used to derive wire
/// names from declared names. Affects validators built after the call;
/// an explicit per-field rename always wins.
pub fn set_field_name_fn<F>(f: F)
where
    F: Fn(&str) -> String + Send + Sync + 'static,
{
    *name_fn_slot().write().expect("naming override poisoned") = Some(Arc::new(f));
    bump_epoch();
}

pub(crate) fn lookup_validator(name: &str) -> Option<CustomFn> {
    custom_registry()
        .read()
        .expect("custom validator registry poisoned")
        .get(name)
        .cloned()
}

pub(crate) fn lookup_context_validator(name: &str) -> Option<ContextFn> {
    context_registry()
        .read()
        .expect("context validator registry poisoned")
        .get(name)
        .cloned()
}

pub(crate) fn lookup_struct_validator(type_id: TypeId) -> Option<Arc<StructEntry>> {
    struct_registry()
        .read()
        .expect("struct validator registry poisoned")
        .get(&type_id)
        .cloned()
}

pub(crate) fn lookup_alias(name: &str) -> Option<String> {
    alias_registry()
        .read()
        .expect("alias registry poisoned")
        .get(name)
        .cloned()
}

/// Resolve a declared field name to its wire name through the naming
/// override, when one is installed.
pub(crate) fn apply_name_fn(declared: &str) -> Option<String> {
    name_fn_slot()
        .read()
        .expect("naming override poisoned")
        .as_ref()
        .map(|f| f(declared))
}

pub(crate) fn short_type_name<T>() -> &'static str {
    let full = std::any::type_name::<T>();
    full.rsplit("::").next().unwrap_or(full)
}
