/// Namespace Browser Example
///
/// This example demonstrates:
/// - Browsing variables that live behind a request/response channel
/// - One batched describe per page
/// - Searching with the filter proxy
/// - Remote mutations followed by a reload

use collview::{
    AdapterOptions, CollectionAdapter, FilterProxy, InsertAt, Key, Loopback, Mapping, Namespace, NdArray,
    RemoteProvider, Value,
};
use std::cell::RefCell;
use std::rc::Rc;

fn print_rows(title: &str, proxy: &FilterProxy) {
    println!("   {}", title);
    for row in 0..proxy.row_count() {
        let key = proxy.get_key(row).map(|k| k.to_string()).unwrap_or_default();
        let value = proxy.display(row, 3).unwrap_or_default();
        println!("     {:<12} {}", key, value.replace('\n', " "));
    }
}

fn main() {
    env_logger::init();
    println!("=== CollView Namespace Browser Example ===\n");

    // 1. Build the owning side
    println!("1. Populating a namespace with 120 variables...");
    let mut values: Mapping = (0..115).map(|i| (Key::from(format!("temp{}", i)), Value::Int(i))).collect();
    values.insert(Key::from("prices"), Value::Array(NdArray::new(vec![4], vec![9.5, 3.25, 7.0, 1.0])));
    values.insert(Key::from("names"), Value::list(vec![Value::str("ada"), Value::str("grace")]));
    values.insert(Key::from("config"), Value::dict(vec![("debug", Value::Bool(true))]));
    values.insert(Key::from("price_cap"), Value::Float(12.5));
    values.insert(Key::from("label"), Value::str("quarterly"));

    let channel = Loopback::new(Namespace::new(values).with_minmax(true));

    // 2. Open an adapter over the channel
    println!("\n2. Opening a remote adapter...");
    let provider = RemoteProvider::new(channel.clone());
    let adapter = CollectionAdapter::new(Box::new(provider), AdapterOptions::default().remote(true).minmax(true))
        .expect("namespace should load");
    let adapter = Rc::new(RefCell::new(adapter));
    println!(
        "   {} rows, {} loaded, {} round trips",
        adapter.borrow().total_row_count(),
        adapter.borrow().row_count(),
        channel.round_trips()
    );

    // 3. Search
    println!("\n3. Searching for 'price'...");
    let mut proxy = FilterProxy::new(Rc::clone(&adapter));
    proxy.find("price").expect("search should succeed");
    print_rows("matches (best first):", &proxy);
    println!("   round trips so far: {}", channel.round_trips());

    // 4. Mutate remotely
    println!("\n4. Adding a variable and renaming another...");
    {
        let mut source = adapter.borrow_mut();
        source
            .insert(InsertAt::Key(Key::from("price_floor")), Value::Float(2.0))
            .expect("insert should succeed");
        source
            .rename(&Key::from("price_cap"), &Key::from("price_ceiling"))
            .expect("rename should succeed");
    }
    proxy.find("price").expect("search should succeed");
    print_rows("after edits:", &proxy);

    // 5. Commands run on the owning side
    println!("\n5. Executing a command remotely...");
    channel.namespace().borrow_mut().handle(collview::Request::Execute {
        command: "del label".to_string(),
    });
    adapter.borrow_mut().refresh().expect("reload should succeed");
    println!("   {} rows after deleting 'label'", adapter.borrow().total_row_count());

    println!("\n=== Example Complete ===");
}
