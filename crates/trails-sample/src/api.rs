//! Raw api resources for the sample application.

use serde_json::{json, Value};
use trails_runtime::{ApiResources, RawDefinition};

/// A `user` model whose operations cross-reference each other through the
/// bound table, plus an empty set of the remaining categories.
pub fn sample_api() -> ApiResources {
    let user = RawDefinition::new("user")
        .attr("table", json!("users"))
        .op("table_name", |table, _args| {
            Ok(table.attr("table").cloned().unwrap_or(Value::Null))
        })
        .op("find_query", |table, args| {
            let table_name = table.invoke("table_name", &[])?;
            let id = args.first().cloned().unwrap_or(Value::Null);
            Ok(json!({
                "select": "*",
                "from": table_name,
                "where": { "id": id },
            }))
        });

    ApiResources {
        models: vec![user],
        ..ApiResources::default()
    }
}
