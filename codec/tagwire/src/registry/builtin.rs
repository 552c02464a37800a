//! The write handlers every registry falls back to.

use std::{
    any::Any,
    collections::{BTreeMap, BTreeSet},
};

use super::WriteHandlers;
use crate::{
    error::Result,
    value::{BigInt, Record, Value},
    writer::ObjectWriter,
};

fn add<T: Any, F>(handlers: &mut WriteHandlers, tag: &str, handler: F)
where
    F: Fn(&mut dyn ObjectWriter, &T) -> Result<()> + Send + Sync + 'static,
{
    let inserted = handlers.register(tag, handler);
    debug_assert!(inserted, "built-in handler for `{tag}` registered twice");
}

macro_rules! add_ints {
    ($handlers:expr, $($ty:ty),*) => {
        $(
            add::<$ty, _>($handlers, "int", |writer, value| {
                writer.write_int(i64::from(*value))
            });
        )*
    };
}

macro_rules! add_wide_ints {
    ($handlers:expr, $($ty:ty),*) => {
        $(
            add::<$ty, _>($handlers, "int", |writer, value| {
                writer.write_value(&Value::from(*value))
            });
        )*
    };
}

/// Creates the table of built-in write handlers.
///
/// Integers that do not fit an `i64` are written as big integers.
#[must_use]
pub fn write_handlers() -> WriteHandlers {
    let mut handlers = WriteHandlers::new();

    add::<Value, _>(&mut handlers, "value", |writer, value| {
        writer.write_value(value)
    });
    add::<Record, _>(&mut handlers, "record", |writer, record| {
        writer.write_tag(record.tag(), record.components().len())?;

        for component in record.components() {
            writer.write_value(component)?;
        }

        Ok(())
    });
    add::<BigInt, _>(&mut handlers, "bigint", |writer, value| {
        writer.write_value(&Value::BigInt(value.clone()))
    });

    add::<(), _>(&mut handlers, "nil", |writer, _| writer.write_nil());
    add::<Option<Value>, _>(&mut handlers, "value", |writer, value| {
        match value {
            Some(value) => writer.write_value(value),
            None => writer.write_nil(),
        }
    });
    add::<bool, _>(&mut handlers, "bool", |writer, value| {
        writer.write_bool(*value)
    });

    add_ints!(&mut handlers, i8, i16, i32, i64, u8, u16, u32);
    add_wide_ints!(&mut handlers, u64, i128, u128, isize, usize);

    add::<f32, _>(&mut handlers, "float", |writer, value| {
        writer.write_float(*value)
    });
    add::<f64, _>(&mut handlers, "double", |writer, value| {
        writer.write_double(*value)
    });

    add::<String, _>(&mut handlers, "string", |writer, value| {
        writer.write_string(value)
    });
    add::<&'static str, _>(&mut handlers, "string", |writer, value| {
        writer.write_string(value)
    });
    add::<Vec<u8>, _>(&mut handlers, "bytes", |writer, value| {
        writer.write_bytes(value)
    });

    add::<Vec<Value>, _>(&mut handlers, "list", |writer, values| {
        writer.write_list(values)
    });
    add::<BTreeMap<Value, Value>, _>(&mut handlers, "map", |writer, map| {
        writer.write_map(map)
    });
    add::<BTreeSet<Value>, _>(&mut handlers, "set", |writer, set| {
        writer.write_set(set)
    });

    handlers
}
