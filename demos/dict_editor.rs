/// Dictionary Editor Example
///
/// This example demonstrates:
/// - Opening an edit session over a detached copy
/// - The three-state key sort of mappings
/// - Editing values from text, inserting, duplicating and removing
/// - Committing the result back

use collview::{AdapterOptions, EditSession, InsertAt, Key, Record, SortDirection, Value};

fn print_table(session: &EditSession) {
    let adapter = session.adapter();
    println!("   {}", adapter.title());
    println!("   {}", adapter.headers().join(" | "));
    for row in 0..adapter.row_count() {
        let cells: Vec<String> = (0..adapter.column_count())
            .map(|c| adapter.display(row, c).unwrap_or_default())
            .collect();
        println!("   {}", cells.join(" | "));
    }
}

fn main() {
    env_logger::init();
    println!("=== CollView Dictionary Editor Example ===\n");

    let point = Record::new("Point")
        .field("x", Value::Float(1.5))
        .field("y", Value::Float(-2.0))
        .into_object();
    let original = Value::dict(vec![
        ("run10", Value::Int(10)),
        ("run9", Value::Int(9)),
        ("title", Value::str("experiment")),
        ("origin", Value::Object(point)),
    ]);

    // 1. Open a session
    println!("1. Opening an edit session...");
    let mut session = EditSession::open(&original, AdapterOptions::default()).expect("session should open");
    print_table(&session);

    // 2. Sort by key, then back to insertion order
    println!("\n2. Sorting by key (natural order)...");
    session
        .edit(|adapter| adapter.sort(0, SortDirection::Ascending))
        .expect("sort should succeed");
    print_table(&session);
    println!("\n   Sorting ascending again restores insertion order:");
    session
        .edit(|adapter| adapter.sort(0, SortDirection::Ascending))
        .expect("sort should succeed");
    print_table(&session);

    // 3. Edit
    println!("\n3. Editing...");
    session
        .edit(|adapter| {
            let row = adapter.index_of_key(&Key::from("run9")).unwrap_or(0);
            adapter.set_value_from_text(row, "99")?;
            adapter.insert(InsertAt::Key(Key::from("notes")), Value::list(vec![Value::str("ok")]))?;
            adapter.copy(&Key::from("title"), &Key::from("title_backup"))?;
            adapter.remove(&[Key::from("run10")])
        })
        .expect("edits should succeed");
    print_table(&session);

    // 4. Commit
    println!("\n4. Committing...");
    let edited = session.commit().expect("commit should succeed");
    println!("   committed a {} with {} entries", edited.type_name(), edited.len().unwrap_or(0));
    println!("   original still has {} entries", original.len().unwrap_or(0));

    println!("\n=== Example Complete ===");
}
