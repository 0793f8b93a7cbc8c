use super::{Statement, column_type, quote};
use crate::schema::{CREATE_TIME_COLUMN, Check, ID_COLUMN, ResourceDescriptor, table_name};

/// `create table if not exists` for one descriptor.
///
/// Owners and refers become `not null` text columns referencing the target
/// table's id, cascading resp. restricting deletes.
pub fn create_table(descriptor: &ResourceDescriptor) -> Statement {
    let mut columns = Vec::new();

    if descriptor.primary_keys.is_empty() {
        columns.push(format!("{} text primary key", quote(ID_COLUMN)));
    } else {
        columns.push(format!("{} text not null unique", quote(ID_COLUMN)));
    }
    columns.push(format!(
        "{} timestamp with time zone not null",
        quote(CREATE_TIME_COLUMN)
    ));

    for field in &descriptor.fields {
        let mut def = format!("{} {}", quote(&field.name), column_type(field.datatype));
        if field.unique {
            def.push_str(" unique");
        }
        if let Some(Check::Positive) = field.check {
            def.push_str(&format!(" check ({} > 0)", quote(&field.name)));
        }
        columns.push(def);
    }

    for owner in &descriptor.owners {
        columns.push(format!(
            "{} text not null references {} ({}) on delete cascade",
            quote(owner),
            table_name(owner),
            quote(ID_COLUMN)
        ));
    }
    for refer in &descriptor.refers {
        columns.push(format!(
            "{} text not null references {} ({}) on delete restrict",
            quote(refer),
            table_name(refer),
            quote(ID_COLUMN)
        ));
    }

    if !descriptor.primary_keys.is_empty() {
        columns.push(format!("primary key ({})", quoted_list(&descriptor.primary_keys)));
    }
    if !descriptor.unique_keys.is_empty() {
        columns.push(format!("unique ({})", quoted_list(&descriptor.unique_keys)));
    }

    Statement::new(
        format!(
            "create table if not exists {} ({})",
            descriptor.table_name(),
            columns.join(", ")
        ),
        Vec::new(),
    )
}

pub fn drop_table(descriptor: &ResourceDescriptor) -> Statement {
    Statement::new(
        format!("drop table if exists {}", descriptor.table_name()),
        Vec::new(),
    )
}

fn quoted_list(names: &[String]) -> String {
    names.iter().map(|n| quote(n)).collect::<Vec<_>>().join(", ")
}
