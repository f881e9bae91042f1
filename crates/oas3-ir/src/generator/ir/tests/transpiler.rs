use serde_json::json;

use crate::{
  error::PipelineError,
  generator::{
    context::ResolutionContext,
    ir::{Component, IrKind, PrimitiveType},
    tests::support::{document, kind, named, node, pointer, property, transpile},
  },
};

#[test]
fn test_self_reference_terminates_with_one_node() {
  let (arena, roots) = transpile(document(json!({
    "Node": {
      "type": "object",
      "properties": {
        "parent": { "$ref": "#/components/schemas/Node" },
        "children": { "type": "array", "items": { "$ref": "#/components/schemas/Node" } }
      }
    }
  })));
  let id = named(&arena, "Node");

  assert_eq!(roots, vec![id]);
  assert!(node(&arena, id).is_circular);
  assert_eq!(property(&arena, id, "parent"), id);
  let children = property(&arena, id, "children");
  assert_eq!(kind(&arena, children), &IrKind::Array { items: id });
  assert_eq!(arena.iter().filter(|(_, n)| n.component.is_named()).count(), 1);
}

#[test]
fn test_inline_nodes_are_named_after_their_position() {
  let (arena, _) = transpile(document(json!({
    "Pet": {
      "type": "object",
      "properties": {
        "owner": { "type": "object", "properties": { "name": { "type": "string" } } },
        "tags": { "type": "array", "items": { "type": "object", "properties": { "label": { "type": "string" } } } },
        "status": { "type": "string", "nullable": true },
        "born": { "type": "string", "format": "date" },
        "meta": { "description": "anything" }
      },
      "required": ["owner"]
    }
  })));
  let pet = named(&arena, "Pet");

  let owner = property(&arena, pet, "owner");
  assert_eq!(node(&arena, owner).component, Component::Inline { name: "PetOwner".to_string() });
  assert!(arena.get(pet).as_object().unwrap().property("owner").unwrap().required);
  assert!(!arena.get(pet).as_object().unwrap().property("tags").unwrap().required);

  let tags = property(&arena, pet, "tags");
  assert_eq!(arena.name(tags), "PetTags");
  let IrKind::Array { items } = *kind(&arena, tags) else {
    panic!("tags is not an array");
  };
  assert_eq!(arena.name(items), "PetTag");

  let status = property(&arena, pet, "status");
  assert!(node(&arena, status).nullable);
  assert_eq!(
    kind(&arena, status),
    &IrKind::Primitive {
      primitive: PrimitiveType::String,
      format: None
    }
  );

  let born = property(&arena, pet, "born");
  assert_eq!(
    kind(&arena, born),
    &IrKind::Primitive {
      primitive: PrimitiveType::String,
      format: Some("date".to_string())
    }
  );

  assert_eq!(kind(&arena, property(&arena, pet, "meta")), &IrKind::Opaque);
}

#[test]
fn test_enum_classification_wins_over_primitive() {
  let (arena, _) = transpile(document(json!({
    "Status": { "type": "string", "enum": ["available", "sold"] },
    "Mixed": { "enum": [{ "a": 1 }] }
  })));

  assert_eq!(
    kind(&arena, named(&arena, "Status")),
    &IrKind::Enum {
      values: vec![json!("available"), json!("sold")]
    }
  );
  assert_eq!(kind(&arena, named(&arena, "Mixed")), &IrKind::Opaque);
}

#[test]
fn test_additional_properties() {
  let (arena, _) = transpile(document(json!({
    "Labels": { "type": "object", "additionalProperties": { "type": "string" } },
    "Free": { "type": "object", "additionalProperties": true },
    "Closed": { "type": "object", "additionalProperties": false }
  })));

  let labels = arena.get(named(&arena, "Labels")).as_object().unwrap();
  let value = labels.additional_properties.expect("typed values");
  assert_eq!(arena.name(value), "LabelsValue");
  assert!(matches!(kind(&arena, value), IrKind::Primitive { primitive: PrimitiveType::String, .. }));

  let free = arena.get(named(&arena, "Free")).as_object().unwrap();
  assert_eq!(kind(&arena, free.additional_properties.unwrap()), &IrKind::Opaque);

  assert!(arena.get(named(&arena, "Closed")).as_object().unwrap().additional_properties.is_none());
}

#[test]
fn test_discriminated_union_attaches_literals() {
  let (arena, _) = transpile(document(json!({
    "AnyPet": {
      "oneOf": [
        { "$ref": "#/components/schemas/Cat" },
        { "$ref": "#/components/schemas/Dog" }
      ],
      "discriminator": {
        "propertyName": "petType",
        "mapping": { "cat": "#/components/schemas/Cat", "dog": "#/components/schemas/Dog" }
      }
    },
    "Cat": { "type": "object", "properties": { "petType": { "type": "string" }, "meows": { "type": "boolean" } } },
    "Dog": { "type": "object", "properties": { "barks": { "type": "boolean" } } }
  })));
  let (cat, dog) = (named(&arena, "Cat"), named(&arena, "Dog"));

  let IrKind::Union(union) = kind(&arena, named(&arena, "AnyPet")) else {
    panic!("AnyPet is not a union");
  };
  assert_eq!(union.members, vec![cat, dog]);
  let discriminator = union.discriminator.as_ref().expect("discriminator kept");
  assert_eq!(discriminator.property_name, "petType");
  assert_eq!(discriminator.mapping.get("cat"), Some(&cat));
  assert_eq!(discriminator.mapping.get("dog"), Some(&dog));

  assert_eq!(
    kind(&arena, property(&arena, cat, "petType")),
    &IrKind::DiscriminatorProperty {
      property_name: "petType".to_string(),
      values: vec!["cat".to_string()]
    }
  );

  let dog_object = arena.get(dog).as_object().unwrap();
  let added = dog_object.properties.last().unwrap();
  assert_eq!(added.name, "petType");
  assert!(added.required);
}

#[test]
fn test_literals_accumulate_across_unions() {
  let (arena, _) = transpile(document(json!({
    "First": {
      "oneOf": [{ "$ref": "#/components/schemas/Cat" }],
      "discriminator": { "propertyName": "petType", "mapping": { "cat": "#/components/schemas/Cat" } }
    },
    "Second": {
      "oneOf": [{ "$ref": "#/components/schemas/Cat" }],
      "discriminator": { "propertyName": "petType", "mapping": { "kitty": "#/components/schemas/Cat" } }
    },
    "Cat": { "type": "object", "properties": { "petType": { "type": "string" } } }
  })));
  let cat = named(&arena, "Cat");

  assert_eq!(
    kind(&arena, property(&arena, cat, "petType")),
    &IrKind::DiscriminatorProperty {
      property_name: "petType".to_string(),
      values: vec!["cat".to_string(), "kitty".to_string()]
    }
  );
}

#[test]
fn test_mapping_target_outside_union_fails() {
  let doc = document(json!({
    "Dog": { "type": "object" },
    "Cat": { "type": "object" },
    "OnlyCats": {
      "oneOf": [{ "$ref": "#/components/schemas/Cat" }],
      "discriminator": { "propertyName": "petType", "mapping": { "dog": "#/components/schemas/Dog" } }
    }
  }));
  let context = ResolutionContext::new(doc).unwrap();
  let error = context.transpiler().transpile_components().unwrap_err();

  assert!(matches!(error, PipelineError::Schema { ref id, .. } if *id == pointer("OnlyCats")));
  assert!(matches!(
    error.root_cause(),
    PipelineError::DiscriminatorTargetNotMember { value, .. } if value == "dog"
  ));
}

#[test]
fn test_any_of_union_has_no_discriminator() {
  let (arena, _) = transpile(document(json!({
    "Value": { "anyOf": [{ "type": "string" }, { "type": "integer" }] }
  })));

  let IrKind::Union(union) = kind(&arena, named(&arena, "Value")) else {
    panic!("Value is not a union");
  };
  assert!(union.discriminator.is_none());
  let names: Vec<&str> = union.members.iter().map(|member| arena.name(*member)).collect();
  assert_eq!(names, vec!["ValueOption1", "ValueOption2"]);
}

#[test]
fn test_single_inheritance_keeps_parent_link() {
  let (arena, _) = transpile(document(json!({
    "Parent": { "type": "object", "properties": { "id": { "type": "string" } } },
    "Child": {
      "allOf": [
        { "$ref": "#/components/schemas/Parent" },
        { "type": "object", "properties": { "name": { "type": "string" }, "nick": { "type": "string" } } }
      ],
      "required": ["name"]
    }
  })));
  let child = arena.get(named(&arena, "Child")).as_object().unwrap();

  assert_eq!(child.parent, Some(named(&arena, "Parent")));
  assert!(child.property("id").is_none());
  assert!(child.property("name").unwrap().required);
  assert!(!child.property("nick").unwrap().required);
}

#[test]
fn test_parent_still_being_built_is_accepted() {
  let (arena, _) = transpile(document(json!({
    "Parent": {
      "type": "object",
      "properties": { "child": { "$ref": "#/components/schemas/Child" } }
    },
    "Child": {
      "allOf": [
        { "$ref": "#/components/schemas/Parent" },
        { "properties": { "name": { "type": "string" } } }
      ]
    }
  })));
  let child = named(&arena, "Child");

  assert_eq!(arena.get(child).as_object().unwrap().parent, Some(named(&arena, "Parent")));
  assert!(node(&arena, child).is_lazy);
}

#[test]
fn test_long_all_of_is_rejected() {
  let doc = document(json!({
    "Parent": { "type": "object" },
    "Child": {
      "allOf": [{ "$ref": "#/components/schemas/Parent" }, { "type": "object" }, { "type": "object" }]
    }
  }));
  let context = ResolutionContext::new(doc).unwrap();
  let error = context.transpiler().transpile_components().unwrap_err();

  assert!(matches!(error.root_cause(), PipelineError::AllOfTooLong { len: 3 }));
}

#[test]
fn test_parent_must_be_named_object() {
  let without_reference = document(json!({
    "Child": { "allOf": [{ "properties": { "a": { "type": "string" } } }, { "type": "object" }] }
  }));
  let context = ResolutionContext::new(without_reference).unwrap();
  let error = context.transpiler().transpile_components().unwrap_err();
  assert!(matches!(error.root_cause(), PipelineError::InvalidParent { .. }));

  let primitive_parent = document(json!({
    "Name": { "type": "string" },
    "Child": { "allOf": [{ "$ref": "#/components/schemas/Name" }, { "type": "object" }] }
  }));
  let context = ResolutionContext::new(primitive_parent).unwrap();
  let error = context.transpiler().transpile_components().unwrap_err();
  assert!(matches!(
    error.root_cause(),
    PipelineError::InvalidParent { pointer: parent } if *parent == pointer("Name")
  ));
}

#[test]
fn test_shared_references_are_memoized() {
  let (arena, _) = transpile(document(json!({
    "Pair": {
      "type": "object",
      "properties": {
        "left": { "$ref": "#/components/schemas/Item" },
        "right": { "$ref": "#/components/schemas/Item" }
      }
    },
    "Item": { "type": "object" }
  })));
  let pair = named(&arena, "Pair");
  let item = named(&arena, "Item");

  assert_eq!(property(&arena, pair, "left"), item);
  assert_eq!(property(&arena, pair, "right"), item);
}

#[test]
fn test_reference_to_cycle_is_lazy() {
  let (arena, _) = transpile(document(json!({
    "Holder": { "type": "object", "properties": { "node": { "$ref": "#/components/schemas/Node" } } },
    "Node": { "type": "object", "properties": { "next": { "$ref": "#/components/schemas/Node" } } }
  })));
  let holder = node(&arena, named(&arena, "Holder"));

  assert!(!holder.is_circular);
  assert!(holder.is_lazy);
}

#[test]
fn test_colliding_type_names_are_suffixed() {
  let (arena, _) = transpile(document(json!({
    "pet_owner": { "type": "object" },
    "PetOwner": { "type": "object" }
  })));

  assert!(arena.find_named("PetOwner").is_some());
  assert!(arena.find_named("PetOwner2").is_some());
}
