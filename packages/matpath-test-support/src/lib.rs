//! Shared fixtures and a conformance suite for `RecordStore` backends.
//!
//! A backend crate runs the whole suite with one macro call in an integration test:
//!
//! ```ignore
//! matpath_test_support::conformance_suite!(MyStore::new_in_memory().unwrap());
//! ```

pub mod conformance;
pub mod faulty;
pub mod fixture;

pub use faulty::FaultyStore;
pub use fixture::{name_of, names, ordered_names, Hierarchy};

/// Expands to one `#[test]` per conformance check. `$make` is evaluated once per test and must
/// produce a fresh, empty store.
#[macro_export]
macro_rules! conformance_suite {
    (@tests $make:expr; $($check:ident),* $(,)?) => {
        $(
            #[test]
            fn $check() {
                $crate::conformance::$check($make);
            }
        )*
    };
    ($make:expr) => {
        $crate::conformance_suite!(@tests $make;
            roots_are_the_bosses_in_numeric_order,
            roots_follow_store_ordering_for_other_columns,
            attribute_ordering_ranks_value_types,
            create_root_uses_own_id_as_path,
            save_as_root_detaches_a_child,
            transient_node_moves_under_parent,
            first_child_counts_from_zero,
            children_honour_direction,
            descendants_cover_the_subtree_only,
            ancestors_run_from_the_root,
            parent_and_root_lookups,
            siblings_share_a_parent,
            sort_list_by_named_column,
            cascading_move_rewrites_the_subtree,
            uncascaded_move_leaves_descendants_behind,
            moving_under_own_subtree_is_a_cycle,
            move_under_missing_parent_is_not_found,
            failed_move_rolls_back_every_write,
            failed_commit_is_a_transaction_error,
            destroy_descendants_keeps_the_node,
            destroy_descendants_respects_segment_boundaries,
            build_tree_links_each_node_to_its_path_parent,
        );
    };
}
