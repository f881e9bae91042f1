use serde_json::{Value, json};

use super::support::{component, document_with_paths, named, pointer, property};
use crate::{
  error::PipelineError,
  generator::{
    config::PipelineConfig,
    ir::IrKind,
    orchestrator::{Orchestrator, PipelineOutput},
  },
};

fn pet_store() -> Value {
  document_with_paths(
    json!({
      "/pets": {
        "get": {
          "operationId": "listPets",
          "responses": {
            "200": {
              "description": "ok",
              "content": {
                "application/json": {
                  "schema": { "type": "array", "items": { "$ref": "#/components/schemas/AnyPet" } }
                }
              }
            }
          }
        },
        "post": {
          "operationId": "createPet",
          "requestBody": {
            "required": true,
            "content": { "application/json": { "schema": { "$ref": "#/components/schemas/AnyPet" } } }
          },
          "responses": { "201": { "description": "created" } }
        }
      }
    }),
    json!({
      "Pet": {
        "type": "object",
        "discriminator": { "propertyName": "petType" },
        "properties": {
          "id": { "type": "integer", "format": "int64" },
          "petType": { "type": "string", "enum": ["cat", "dog"] },
          "tags": { "type": "array", "items": { "$ref": "#/components/schemas/Tag" } }
        },
        "required": ["id", "petType"]
      },
      "Tag": { "type": "object", "properties": { "name": { "type": "string" } } },
      "Cat": {
        "allOf": [
          { "$ref": "#/components/schemas/Pet" },
          { "type": "object", "properties": { "meows": { "type": "boolean" } } }
        ]
      },
      "Dog": {
        "allOf": [
          { "$ref": "#/components/schemas/Pet" },
          { "type": "object", "properties": { "barks": { "type": "boolean" } } }
        ]
      },
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
      "Node": {
        "type": "object",
        "properties": {
          "parent": { "$ref": "#/components/schemas/Node" },
          "children": { "type": "array", "items": { "$ref": "#/components/schemas/Node" } }
        }
      }
    }),
  )
}

fn run(config: PipelineConfig, input: &Value) -> PipelineOutput {
  Orchestrator::new(config).run(input).expect("pipeline succeeds")
}

fn position(output: &PipelineOutput, name: &str) -> usize {
  let id = named(&output.arena, name);
  output
    .schemas
    .iter()
    .position(|candidate| *candidate == id)
    .unwrap_or_else(|| panic!("{name} missing from order"))
}

#[test]
fn test_default_run() {
  let input = pet_store();
  let output = run(PipelineConfig::default(), &input);
  let arena = &output.arena;

  assert_eq!(output.schemas.len(), 6);
  assert!(position(&output, "Tag") < position(&output, "Pet"));
  assert!(position(&output, "Pet") < position(&output, "Cat"));
  assert!(position(&output, "Pet") < position(&output, "Dog"));
  assert!(position(&output, "Cat") < position(&output, "AnyPet"));
  assert!(position(&output, "Dog") < position(&output, "AnyPet"));

  let cat = named(arena, "Cat");
  let cat_object = arena.get(cat).as_object().expect("Cat is an object");
  assert_eq!(cat_object.parent, Some(named(arena, "Pet")));
  let literal = property(arena, cat, "petType");
  assert_eq!(
    arena.get(literal).kind,
    IrKind::DiscriminatorProperty {
      property_name: "petType".to_string(),
      values: vec!["cat".to_string()],
    }
  );
  assert!(cat_object.property("petType").is_some_and(|p| p.required));

  let node = arena.get(named(arena, "Node"));
  assert!(node.is_circular);
  assert!(node.is_lazy);

  assert_eq!(output.endpoints.len(), 2);
  assert_eq!(output.stats.schemas_merged, 2);
  assert_eq!(output.stats.discriminator_values_propagated, 2);
  assert_eq!(output.stats.cycles_detected, 1);
  assert_eq!(output.stats.cycle_details, vec![vec![pointer("Node")]]);
  assert_eq!(output.stats.named_schemas, 6);
  assert_eq!(output.stats.endpoints_converted, 2);
  assert_eq!(output.stats.ir_nodes_created, arena.len());
  assert!(output.stats.warnings.is_empty());
}

#[test]
fn test_output_document_is_propagated_and_input_untouched() {
  let input = pet_store();
  let snapshot = input.clone();
  let output = run(PipelineConfig::default(), &input);

  assert_eq!(input, snapshot);
  let cat_leaf = &component(&output.document, "Cat")["allOf"][1];
  assert_eq!(cat_leaf["properties"]["petType"]["x-discriminator-values"], json!(["cat"]));
  assert!(component(&output.document, "Pet")["properties"]["petType"].get("enum").is_none());
}

#[test]
fn test_force_merge_run() {
  let config = PipelineConfig::builder().force_merge(true).build();
  let output = run(config, &pet_store());
  let arena = &output.arena;

  let cat = named(arena, "Cat");
  let cat_object = arena.get(cat).as_object().expect("Cat is an object");
  assert!(cat_object.parent.is_none());
  for name in ["id", "petType", "tags", "meows"] {
    assert!(cat_object.property(name).is_some(), "Cat is missing {name}");
  }
  assert!(component(&output.document, "Cat").get("allOf").is_none());
  assert!(matches!(
    arena.get(property(arena, cat, "petType")).kind,
    IrKind::DiscriminatorProperty { .. }
  ));
}

#[test]
fn test_discriminator_propagation_disabled() {
  let config = PipelineConfig::builder().propagate_discriminators(false).build();
  let output = run(config, &pet_store());

  let cat_leaf = &component(&output.document, "Cat")["allOf"][1];
  assert!(cat_leaf["properties"].get("petType").is_none());
  assert_eq!(output.stats.discriminator_values_propagated, 0);

  // The IR still carries the literal on the member.
  let arena = &output.arena;
  let cat = named(arena, "Cat");
  assert!(matches!(
    arena.get(property(arena, cat, "petType")).kind,
    IrKind::DiscriminatorProperty { .. }
  ));
}

#[test]
fn test_endpoints_skipped() {
  let config = PipelineConfig::builder().include_endpoints(false).build();
  let output = run(config, &pet_store());

  assert!(output.endpoints.is_empty());
  assert_eq!(output.stats.endpoints_converted, 0);
}

#[test]
fn test_ir_serialization() {
  let output = run(PipelineConfig::default(), &pet_store());
  let ir = serde_json::to_value(output.ir()).expect("IR serializes");

  assert_eq!(ir["order"].as_array().map(Vec::len), Some(6));
  assert_eq!(ir["nodes"].as_array().map(Vec::len), Some(output.arena.len()));
  assert_eq!(ir["endpoints"][0]["alias"], "listPets");
  assert_eq!(ir["endpoints"][0]["method"], "get");

  let node_id = named(&output.arena, "Node").0;
  assert_eq!(ir["nodes"][node_id]["component"]["source"], "named");
  assert_eq!(ir["nodes"][node_id]["kind"]["type"], "object");
}

#[test]
fn test_fatal_error_carries_schema() {
  let input = document_with_paths(
    json!({}),
    json!({ "Broken": { "type": "object", "properties": { "x": { "$ref": "#/components/schemas/Missing" } } } }),
  );
  let error = Orchestrator::new(PipelineConfig::default()).run(&input).unwrap_err();

  assert!(matches!(
    error.root_cause(),
    PipelineError::DanglingReference { pointer: missing } if missing == "#/components/schemas/Missing"
  ));
}

#[test]
fn test_two_discriminated_parents_keep_every_property() {
  let input = document_with_paths(
    json!({}),
    json!({
      "P1": { "type": "object", "discriminator": { "propertyName": "k1" }, "properties": { "k1": { "type": "string" } } },
      "P2": { "type": "object", "discriminator": { "propertyName": "k2" }, "properties": { "k2": { "type": "string" } } },
      "Both": {
        "allOf": [
          { "$ref": "#/components/schemas/P1" },
          { "$ref": "#/components/schemas/P2" },
          { "properties": { "own": { "type": "string" } }, "required": ["own"] }
        ]
      }
    }),
  );
  let output = run(PipelineConfig::default(), &input);
  let arena = &output.arena;
  let [p1, p2, both] = ["P1", "P2", "Both"].map(|name| named(arena, name));

  let both_object = arena.get(both).as_object().expect("Both is an object");
  assert_eq!(both_object.parent, Some(p2));
  assert!(both_object.property("own").is_some_and(|p| p.required));
  assert!(both_object.property("k1").is_some());

  let base = arena
    .iter()
    .find(|(_, node)| !node.component.is_named() && node.as_object().is_some_and(|object| object.parent == Some(p1)))
    .map(|(_, node)| node)
    .expect("an inline node extends P1");
  assert!(base.as_object().is_some_and(|object| object.property("own").is_some()));

  assert!(position(&output, "P2") < position(&output, "Both"));
}

#[test]
fn test_recursive_array_alias_run() {
  let input = document_with_paths(
    json!({}),
    json!({ "Tree": { "type": "array", "items": { "$ref": "#/components/schemas/Tree" } } }),
  );
  let output = run(PipelineConfig::default(), &input);
  let arena = &output.arena;
  let tree = named(arena, "Tree");

  assert!(arena.get(tree).is_circular);
  assert_eq!(arena.get(tree).kind, IrKind::Array { items: tree });
  assert_eq!(output.schemas, vec![tree]);
  assert_eq!(output.stats.cycle_details, vec![vec![pointer("Tree")]]);
}
