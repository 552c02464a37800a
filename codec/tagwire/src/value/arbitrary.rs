//! Arbitrary implementations for [`Value`].

use proptest::{
    arbitrary::any,
    collection::{btree_map, btree_set, vec},
    prelude::{Arbitrary, BoxedStrategy, Just, Strategy},
    prop_oneof,
};

use super::{BigInt, Record, Value};

/// Tags generated for records; prefixed so they never collide with the
/// reserved built-in tag names.
pub(crate) fn record_tag() -> impl Strategy<Value = String> {
    "x-[a-z]{1,6}"
}

fn leaf() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Nil),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::Int),
        (-64i64..64).prop_map(Value::Int),
        any::<i128>().prop_map(|x| Value::BigInt(BigInt::from(x))),
        any::<f32>().prop_map(Value::Float32),
        any::<f64>().prop_map(Value::Float64),
        vec(any::<u8>(), 0..24).prop_map(Value::Bytes),
        ".{0,12}".prop_map(Value::String),
    ]
}

impl Arbitrary for Value {
    type Strategy = BoxedStrategy<Self>;
    type Parameters = ();

    fn arbitrary_with((): Self::Parameters) -> Self::Strategy {
        leaf()
            .prop_recursive(4, 48, 6, |inner| {
                prop_oneof![
                    vec(inner.clone(), 0..10).prop_map(Value::List),
                    btree_map(inner.clone(), inner.clone(), 0..5)
                        .prop_map(Value::Map),
                    btree_set(inner.clone(), 0..5).prop_map(Value::Set),
                    (record_tag(), vec(inner, 0..4)).prop_map(
                        |(tag, components)| {
                            Value::Extended(Record::new(tag, components))
                        }
                    ),
                ]
            })
            .boxed()
    }
}
