/// CollView - Table Views over Heterogeneous Collections
///
/// Presents sequences, mappings, sets and arbitrary objects as sortable,
/// filterable, incrementally loaded tables, with structural editing that
/// keeps row addressing correct under reordering and paging. The same
/// adapter works over values that live in another execution context,
/// reached through a request/response channel with batched metadata.

pub mod error;
pub mod value;
pub mod object;
pub mod classify;
pub mod natural;
pub mod display;
pub mod sort;
pub mod search;
pub mod collection;
pub mod provider;
pub mod messages;
pub mod remote;
pub mod changeset;
pub mod config;
pub mod adapter;
pub mod mutation;
pub mod proxy;
pub mod selection;
pub mod session;

pub use error::{Error, Result};
pub use value::{Frame, FrameKind, ImageInfo, Key, Mapping, NdArray, Value};
pub use object::{AttrError, GenericObjectView, Introspect, ObjectRef, Record};
pub use classify::{classify, DisplayCategory, SpecializedKind};
pub use natural::{natural_cmp, ordinal_cmp};
pub use display::{display_to_value, parse_literal, value_to_display};
pub use sort::{SortDirection, SortState};
pub use collection::{Collection, CollectionKind};
pub use provider::{LocalProvider, Metadata, ValueProvider, ValueTraits};
pub use messages::{Request, Response};
pub use remote::{Channel, Loopback, Namespace, RemoteProvider};
pub use changeset::{AdapterChange, Changeset, IncrementalView, IndexAdjuster};
pub use config::{AdapterOptions, LARGE_THRESHOLD, PAGE_SIZE};
pub use adapter::{CollectionAdapter, PageRequest, PageResult, Row};
pub use mutation::{InsertAt, Placement};
pub use proxy::FilterProxy;
pub use selection::RowSelection;
pub use session::EditSession;

#[cfg(test)]
mod integration_tests {
    use super::*;
    use std::cell::RefCell;
    use std::cmp::Ordering;
    use std::rc::Rc;

    fn names(count: usize) -> Namespace {
        Namespace::new((0..count).map(|i| (Key::from(format!("var{}", i)), Value::Int(i as i64))).collect())
    }

    #[test]
    fn test_paging_workflow() {
        let value = Value::list((0..(LARGE_THRESHOLD as i64 + 30)).map(Value::Int));
        let mut adapter = CollectionAdapter::from_value(value, AdapterOptions::default()).unwrap();
        assert_eq!(adapter.row_count(), PAGE_SIZE);

        while adapter.can_fetch_more() {
            adapter.fetch_more(None).unwrap();
        }
        assert_eq!(adapter.row_count(), 130);
        assert_eq!(adapter.fetch_more(None).unwrap(), 0);
        assert_eq!(adapter.row_count(), 130);
    }

    #[test]
    fn test_natural_and_ordinal_disagree() {
        assert_eq!(natural_cmp("test3", "test100"), Ordering::Less);
        assert_eq!(ordinal_cmp("test3", "test100"), Ordering::Greater);
    }

    #[test]
    fn test_mapping_restore_after_double_ascending_sort() {
        let value = Value::dict(vec![("zeta", Value::Null), ("alpha", Value::Null), ("mid10", Value::Null), ("mid9", Value::Null)]);
        let mut adapter = CollectionAdapter::from_value(value, AdapterOptions::default()).unwrap();
        let initial: Vec<Key> = (0..4).map(|r| adapter.get_key(r).unwrap()).collect();

        adapter.sort(0, SortDirection::Ascending).unwrap();
        assert_eq!(adapter.get_key(1).unwrap(), Key::from("mid9"));
        adapter.sort(0, SortDirection::Ascending).unwrap();
        let restored: Vec<Key> = (0..4).map(|r| adapter.get_key(r).unwrap()).collect();
        assert_eq!(restored, initial);
    }

    #[test]
    fn test_filter_hides_exactly_non_matching_rows() {
        let value = Value::dict(vec![
            ("my_abc", Value::Int(1)),
            ("other", Value::Int(2)),
            ("ABCD", Value::Null),
            ("plain", Value::str("abc")),
        ]);
        let adapter = Rc::new(RefCell::new(CollectionAdapter::from_value(value, AdapterOptions::default()).unwrap()));
        let mut proxy = FilterProxy::new(adapter);

        proxy.set_filter("abc").unwrap();
        let visible: Vec<Key> = (0..proxy.row_count()).map(|r| proxy.get_key(r).unwrap()).collect();
        assert_eq!(visible, vec![Key::from("my_abc"), Key::from("ABCD")]);

        proxy.set_filter("").unwrap();
        assert_eq!(proxy.row_count(), 4);
    }

    #[test]
    fn test_unorderable_values_sort_without_error() {
        let value = Value::list(vec![
            Value::Int(3),
            Value::Array(NdArray::new(vec![2], vec![1.0, 2.0])),
            Value::str("text"),
            Value::Int(1),
        ]);
        let adapter = Rc::new(RefCell::new(CollectionAdapter::from_value(value, AdapterOptions::default()).unwrap()));
        let mut proxy = FilterProxy::new(Rc::clone(&adapter));
        proxy.sort(3, SortDirection::Ascending).unwrap();
        assert_eq!(proxy.row_count(), 4);

        adapter.borrow_mut().sort(3, SortDirection::Descending).unwrap();
        assert_eq!(adapter.borrow().sort_state(), SortState::Descending(3));
    }

    #[test]
    fn test_remote_page_is_one_round_trip() {
        let channel = Loopback::new(names(150));
        let provider = RemoteProvider::new(channel.clone());
        let mut adapter = CollectionAdapter::new(Box::new(provider), AdapterOptions::default().remote(true)).unwrap();
        // list names + first page
        assert_eq!(channel.round_trips(), 2);
        assert_eq!(adapter.row_count(), 50);

        adapter.fetch_more(None).unwrap();
        assert_eq!(channel.round_trips(), 3);
        assert_eq!(adapter.display(99, 3).unwrap(), "99");
    }

    #[test]
    fn test_reset_during_fetch_discards_stale_page() {
        let mut adapter = CollectionAdapter::from_value(
            Value::list((0..400).map(Value::Int)),
            AdapterOptions::default(),
        )
        .unwrap();
        let in_flight = adapter.request_page(None).unwrap();
        let page = adapter.resolve_page(in_flight).unwrap();

        adapter
            .reset(Box::new(LocalProvider::from_value(Value::list((0..120).map(Value::Int))).unwrap()))
            .unwrap();
        assert!(!adapter.apply_page(page));
        assert_eq!(adapter.row_count(), PAGE_SIZE);
        assert_eq!(adapter.total_row_count(), 120);
    }

    #[test]
    fn test_edit_session_over_remote_variable() {
        let mut namespace = names(2);
        namespace
            .values_mut()
            .insert(Key::from("data"), Value::dict(vec![("k", Value::Int(1))]));
        let channel = Loopback::new(namespace);
        let source = RemoteProvider::new(channel.clone());
        let fetch = Rc::new(RemoteProvider::new(channel.clone()));

        let value = source.get_value(&Key::from("data")).unwrap();
        let fetcher = Rc::clone(&fetch);
        let mut session = EditSession::open(&value, AdapterOptions::default())
            .unwrap()
            .with_data_function(Box::new(move || fetcher.get_value(&Key::from("data"))));
        session
            .edit(|adapter| adapter.insert(InsertAt::Key(Key::from("k2")), Value::Int(2)))
            .unwrap();
        let edited = session.commit().unwrap();

        let mut writer = RemoteProvider::new(channel.clone());
        writer.set_value(&Key::from("data"), edited).unwrap();
        assert!(session.refresh(false).unwrap());
        assert_eq!(session.adapter().total_row_count(), 2);
    }

    #[test]
    fn test_session_closes_when_remote_variable_is_deleted() {
        let mut namespace = names(2);
        namespace.values_mut().insert(Key::from("data"), Value::list(vec![Value::Int(1)]));
        let channel = Loopback::new(namespace);
        let fetch = RemoteProvider::new(channel.clone());

        let value = fetch.get_value(&Key::from("data")).unwrap();
        let mut session = EditSession::open(&value, AdapterOptions::default())
            .unwrap()
            .with_data_function(Box::new(move || fetch.get_value(&Key::from("data"))));

        let mut writer = RemoteProvider::new(channel.clone());
        writer.remove_values(&[Key::from("data")]).unwrap();

        assert!(matches!(session.refresh(true), Err(Error::VariableGone)));
        assert!(session.is_closed());
    }
}
