//! The mutator capability interface: a trait for `filter`/`mutations`/
//! `global_mutations`/`max_depth` so strategies never have to feature-sniff
//! a mutator object.
use crate::node::Node;
use crate::smtlib::SymbolEnv;

/// One semantics-preserving (by design intent, not proof) rewrite rule over
/// SMT-LIB terms. A mutator that doesn't implement a capability simply
/// leaves that method at its default (empty/false), rather than the
/// strategy checking `hasattr` as the original Python does.
pub trait Mutator: Send + Sync {
    /// Stable display name, used in progress/log output.
    fn name(&self) -> &'static str;

    /// Cheap applicability predicate. Default: applies everywhere.
    fn filter(&self, _node: &Node, _env: &SymbolEnv) -> bool {
        true
    }

    /// Local replacements for `node`. `None` means "erase this node".
    /// Default: no local mutations.
    fn mutations(&self, _node: &Node, _env: &SymbolEnv) -> Vec<Option<Node>> {
        Vec::new()
    }

    /// Whole-tree rewrites parameterized by the focus node. Default: none.
    fn global_mutations(&self, _node: &Node, _root: &[Node], _env: &SymbolEnv) -> Vec<Vec<Node>> {
        Vec::new()
    }

    /// Traversal depth limit for this mutator's filter, or `None` for
    /// unlimited. Default: unlimited.
    fn max_depth(&self) -> Option<usize> {
        None
    }

    fn has_local(&self) -> bool {
        true
    }
    fn has_global(&self) -> bool {
        false
    }
}

impl std::fmt::Display for dyn Mutator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Run `mutator.mutations`, absorbing a panic as an empty result: a faulty
/// mutator loses its candidates for this node rather than killing the run.
pub fn try_mutations(mutator: &dyn Mutator, node: &Node, env: &SymbolEnv) -> Vec<Option<Node>> {
    std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| mutator.mutations(node, env))).unwrap_or_else(|_| {
        log::info!("mutator {} panicked on a candidate, skipping", mutator.name());
        Vec::new()
    })
}

/// Same, for `global_mutations`.
pub fn try_global_mutations(mutator: &dyn Mutator, node: &Node, root: &[Node], env: &SymbolEnv) -> Vec<Vec<Node>> {
    std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| mutator.global_mutations(node, root, env))).unwrap_or_else(|_| {
        log::info!("mutator {} panicked on a candidate, skipping", mutator.name());
        Vec::new()
    })
}

/// Which mutators (by name) are enabled, built once at startup from CLI
/// flags (`--[no-]<mutator-name>`).
#[derive(Debug, Clone)]
pub struct MutatorConfig {
    pub enabled: std::collections::HashSet<&'static str>,
}

impl MutatorConfig {
    pub fn all_enabled() -> Self {
        MutatorConfig {
            enabled: crate::mutators::all_names().into_iter().collect(),
        }
    }

    pub fn is_enabled(&self, name: &str) -> bool {
        self.enabled.contains(name)
    }
}

/// Build the active mutator set (respecting the config) in a fixed
/// registration order, so behavior stays predictable run to run.
pub fn active_mutators(cfg: &MutatorConfig) -> Vec<Box<dyn Mutator>> {
    active_mutators_with_mode(cfg, true)
}

/// Same, but with `ReplaceByVariable`'s search direction set explicitly.
pub fn active_mutators_with_mode(cfg: &MutatorConfig, increasing: bool) -> Vec<Box<dyn Mutator>> {
    crate::mutators::all_mutators_with_mode(increasing)
        .into_iter()
        .filter(|m| cfg.is_enabled(m.name()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Panicky;
    impl Mutator for Panicky {
        fn name(&self) -> &'static str {
            "Panicky"
        }
        fn mutations(&self, _node: &Node, _env: &SymbolEnv) -> Vec<Option<Node>> {
            panic!("boom")
        }
        fn global_mutations(&self, _node: &Node, _root: &[Node], _env: &SymbolEnv) -> Vec<Vec<Node>> {
            panic!("boom")
        }
    }

    #[test]
    fn panicking_mutator_yields_no_candidates() {
        let env = SymbolEnv::default();
        let node = Node::leaf("x");
        let prev_hook = std::panic::take_hook();
        std::panic::set_hook(Box::new(|_| {}));
        let local = try_mutations(&Panicky, &node, &env);
        let global = try_global_mutations(&Panicky, &node, &[], &env);
        std::panic::set_hook(prev_hook);
        assert!(local.is_empty());
        assert!(global.is_empty());
    }
}
