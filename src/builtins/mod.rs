// ABOUTME: Built-in function catalog (§6): wires every `#[builtin]`-annotated
// ABOUTME: function into a fresh global environment and exposes the
// ABOUTME: (name, returns) pairs the static analyzer seeds its root scope with.

mod coercion;
mod collections;
mod io_time;
mod math;
mod strings;

use crate::env::Environment;
use std::rc::Rc;

/// Catalog metadata for one built-in, generated alongside each
/// `register_<fn>` by the `#[builtin(...)]` attribute.
pub struct CatalogMeta {
    pub name: &'static str,
    pub category: &'static str,
    pub returns: &'static str,
}

/// Binds every catalog entry into `env` under its dotted name.
pub fn register_builtins(env: &Rc<Environment>) {
    coercion::register_long(env);
    coercion::register_double(env);
    coercion::register_boolean(env);
    coercion::register_str_fn(env);
    coercion::register_identity(env);
    coercion::register_type_of(env);
    coercion::register_is_def(env);
    coercion::register_cmp(env);

    collections::register_range(env);
    collections::register_tuple(env);
    collections::register_min(env);
    collections::register_max(env);
    collections::register_count(env);
    collections::register_is_empty(env);
    collections::register_seq_list(env);
    collections::register_seq_set(env);
    collections::register_seq_map(env);
    collections::register_seq_add(env);
    collections::register_seq_get(env);
    collections::register_seq_contains_key(env);
    collections::register_seq_remove(env);
    collections::register_map_fn(env);
    collections::register_filter_fn(env);
    collections::register_reduce_fn(env);
    collections::register_include_fn(env);
    collections::register_sort_fn(env);
    collections::register_reverse_fn(env);
    collections::register_seq_eq(env);
    collections::register_seq_neq(env);
    collections::register_seq_gt(env);
    collections::register_seq_ge(env);
    collections::register_seq_lt(env);
    collections::register_seq_le(env);
    collections::register_seq_nil(env);
    collections::register_seq_exists(env);

    strings::register_string_length(env);
    strings::register_string_contains(env);
    strings::register_string_starts_with(env);
    strings::register_string_ends_with(env);
    strings::register_string_substring(env);
    strings::register_string_index_of(env);
    strings::register_string_split(env);
    strings::register_string_join(env);
    strings::register_string_replace_first(env);
    strings::register_string_replace_all(env);

    math::register_math_abs(env);
    math::register_math_round(env);
    math::register_math_floor(env);
    math::register_math_ceil(env);
    math::register_math_sqrt(env);
    math::register_math_pow(env);
    math::register_math_log(env);
    math::register_math_log10(env);
    math::register_math_sin(env);
    math::register_math_cos(env);
    math::register_math_tan(env);
    math::register_math_asin(env);
    math::register_math_acos(env);
    math::register_math_atan(env);

    io_time::register_print_fn(env);
    io_time::register_println_fn(env);
    io_time::register_p_fn(env);
    io_time::register_sysdate(env);
    io_time::register_now(env);
    io_time::register_rand_fn(env);
}

/// The full `(name, returns)` catalog, used to seed the static analyzer's
/// root scope (§4.6) so a script calling e.g. `math.sqrt(x)` resolves its
/// return type without the analyzer knowing anything about `math`'s
/// internals.
pub fn catalog() -> Vec<(&'static str, &'static str)> {
    all_metas().into_iter().map(|m| (m.name, m.returns)).collect()
}

/// The catalog grouped by its `category` metadata (§6: "grouped by return
/// kind" for documentation), names sorted within each group — what a host
/// REPL's `.help` command or a generated reference page would walk.
pub fn catalog_by_category() -> Vec<(&'static str, Vec<&'static str>)> {
    let mut groups: Vec<(&'static str, Vec<&'static str>)> = Vec::new();
    for m in all_metas() {
        match groups.iter_mut().find(|(c, _)| *c == m.category) {
            Some((_, names)) => names.push(m.name),
            None => groups.push((m.category, vec![m.name])),
        }
    }
    for (_, names) in groups.iter_mut() {
        names.sort_unstable();
    }
    groups.sort_unstable_by_key(|(c, _)| *c);
    groups
}

fn all_metas() -> Vec<CatalogMeta> {
    vec![
        coercion::meta_long(),
        coercion::meta_double(),
        coercion::meta_boolean(),
        coercion::meta_str_fn(),
        coercion::meta_identity(),
        coercion::meta_type_of(),
        coercion::meta_is_def(),
        coercion::meta_cmp(),
        collections::meta_range(),
        collections::meta_tuple(),
        collections::meta_min(),
        collections::meta_max(),
        collections::meta_count(),
        collections::meta_is_empty(),
        collections::meta_seq_list(),
        collections::meta_seq_set(),
        collections::meta_seq_map(),
        collections::meta_seq_add(),
        collections::meta_seq_get(),
        collections::meta_seq_contains_key(),
        collections::meta_seq_remove(),
        collections::meta_map_fn(),
        collections::meta_filter_fn(),
        collections::meta_reduce_fn(),
        collections::meta_include_fn(),
        collections::meta_sort_fn(),
        collections::meta_reverse_fn(),
        collections::meta_seq_eq(),
        collections::meta_seq_neq(),
        collections::meta_seq_gt(),
        collections::meta_seq_ge(),
        collections::meta_seq_lt(),
        collections::meta_seq_le(),
        collections::meta_seq_nil(),
        collections::meta_seq_exists(),
        strings::meta_string_length(),
        strings::meta_string_contains(),
        strings::meta_string_starts_with(),
        strings::meta_string_ends_with(),
        strings::meta_string_substring(),
        strings::meta_string_index_of(),
        strings::meta_string_split(),
        strings::meta_string_join(),
        strings::meta_string_replace_first(),
        strings::meta_string_replace_all(),
        math::meta_math_abs(),
        math::meta_math_round(),
        math::meta_math_floor(),
        math::meta_math_ceil(),
        math::meta_math_sqrt(),
        math::meta_math_pow(),
        math::meta_math_log(),
        math::meta_math_log10(),
        math::meta_math_sin(),
        math::meta_math_cos(),
        math::meta_math_tan(),
        math::meta_math_asin(),
        math::meta_math_acos(),
        math::meta_math_atan(),
        io_time::meta_print_fn(),
        io_time::meta_println_fn(),
        io_time::meta_p_fn(),
        io_time::meta_sysdate(),
        io_time::meta_now(),
        io_time::meta_rand_fn(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_builtins_binds_every_catalog_name() {
        let env = Environment::new();
        register_builtins(&env);
        for (name, _) in catalog() {
            assert!(env.get(name).is_some(), "{name} was not registered");
        }
    }

    #[test]
    fn catalog_names_are_unique() {
        let names: Vec<_> = catalog().into_iter().map(|(n, _)| n).collect();
        let mut sorted = names.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(names.len(), sorted.len());
    }

    #[test]
    fn catalog_by_category_covers_every_entry_exactly_once() {
        let total: usize = catalog_by_category().into_iter().map(|(_, names)| names.len()).sum();
        assert_eq!(total, catalog().len());
    }
}
