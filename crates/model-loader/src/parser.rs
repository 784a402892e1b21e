// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Builds a runnable [`Model`] from a parsed model document.
//!
//! Four steps, mirroring the document layout:
//! 1. Decode every `initializer` into the registry.
//! 2. Construct one op per `node` entry, keyed by `opType`.
//! 3. Collect the declared `input`/`output` names.
//! 4. Assemble the [`Model`].

use crate::doc::{ModelDoc, NodeDoc};
use crate::weights::decode_tensor;
use crate::ParseError;
use runtime::ops::{
    AddOp, AvgPoolOp, ConstantOp, ConvOp, DropoutOp, FlattenOp, GemmOp, MaxPoolOp, ReluOp,
    ReshapeOp, SwishOp, TanhOp,
};
use runtime::{Model, Node, Registry};
use std::path::Path;

/// Parses a model from a JSON file on disk.
pub fn parse_file(path: &Path) -> Result<Model, ParseError> {
    let content = std::fs::read_to_string(path)?;
    parse_str(&content)
}

/// Parses a model from a JSON string.
pub fn parse_str(json: &str) -> Result<Model, ParseError> {
    let doc: ModelDoc = serde_json::from_str(json)?;
    build_model(&doc)
}

fn build_model(doc: &ModelDoc) -> Result<Model, ParseError> {
    let graph = &doc.graph;

    let mut registry = Registry::new();
    for init in &graph.initializer {
        let name = init
            .name
            .clone()
            .ok_or_else(|| ParseError::MissingField {
                node: "<initializer>".into(),
                what: "name",
            })?;
        let tensor = decode_tensor(init)?;
        registry.insert(name, tensor);
    }

    let nodes = graph
        .node
        .iter()
        .map(build_node)
        .collect::<Result<Vec<_>, _>>()?;

    let inputs: Vec<String> = graph.input.iter().map(|v| v.name.clone()).collect();
    let outputs: Vec<String> = graph.output.iter().map(|v| v.name.clone()).collect();

    tracing::info!(
        "parsed model: {} ops, {} initializers, {} inputs, {} outputs",
        nodes.len(),
        registry.len(),
        inputs.len(),
        outputs.len(),
    );

    Ok(Model::new(nodes, registry, inputs, outputs))
}

/// Fetches a required input name by position.
fn input(node: &NodeDoc, index: usize, what: &'static str) -> Result<String, ParseError> {
    node.input
        .get(index)
        .cloned()
        .ok_or_else(|| ParseError::MissingField {
            node: node.display_name().to_string(),
            what,
        })
}

/// Fetches a required output name by position.
fn output(node: &NodeDoc, index: usize, what: &'static str) -> Result<String, ParseError> {
    node.output
        .get(index)
        .cloned()
        .ok_or_else(|| ParseError::MissingField {
            node: node.display_name().to_string(),
            what,
        })
}

fn build_node(node: &NodeDoc) -> Result<Box<dyn Node>, ParseError> {
    match node.op_type.as_str() {
        "Add" => Ok(Box::new(AddOp::new(
            input(node, 0, "input A")?,
            input(node, 1, "input B")?,
            output(node, 0, "output")?,
        ))),
        "Relu" => Ok(Box::new(ReluOp::new(
            input(node, 0, "input")?,
            output(node, 0, "output")?,
        ))),
        "Tanh" => Ok(Box::new(TanhOp::new(
            input(node, 0, "input")?,
            output(node, 0, "output")?,
        ))),
        "Swish" => Ok(Box::new(SwishOp::new(
            input(node, 0, "input")?,
            output(node, 0, "output")?,
        ))),
        "Gemm" => build_gemm(node),
        "Conv" => build_conv(node),
        "MaxPool" => build_max_pool(node),
        "AveragePool" => build_avg_pool(node),
        "Reshape" => build_reshape(node),
        "Flatten" => Ok(Box::new(FlattenOp::new(
            input(node, 0, "input")?,
            output(node, 0, "output")?,
            node.attr("axis").map(|a| a.as_i64()).transpose()?.unwrap_or(1),
        ))),
        "Dropout" => build_dropout(node),
        "Constant" => build_constant(node),
        other => Err(ParseError::UnsupportedOp(other.to_string())),
    }
}

fn build_gemm(node: &NodeDoc) -> Result<Box<dyn Node>, ParseError> {
    let alpha = node.attr("alpha").map(|a| a.as_f32()).transpose()?.unwrap_or(1.0);
    let beta = node.attr("beta").map(|a| a.as_f32()).transpose()?.unwrap_or(1.0);
    let trans_a = node.attr("transA").map(|a| a.as_i64()).transpose()?.unwrap_or(0) != 0;
    let trans_b = node.attr("transB").map(|a| a.as_i64()).transpose()?.unwrap_or(0) != 0;

    Ok(Box::new(GemmOp::new(
        input(node, 0, "input A")?,
        input(node, 1, "input B")?,
        node.input.get(2).cloned(),
        output(node, 0, "output")?,
        alpha,
        beta,
        trans_a,
        trans_b,
    )))
}

fn build_conv(node: &NodeDoc) -> Result<Box<dyn Node>, ParseError> {
    let dilations = node
        .attr("dilations")
        .map(|a| a.as_usize_vec())
        .transpose()?
        .unwrap_or_else(|| vec![1, 1]);
    let pads = node
        .attr("pads")
        .map(|a| a.as_i64_vec())
        .transpose()?
        .unwrap_or_else(|| vec![0, 0, 0, 0]);
    let kernel_shape = node
        .attr("kernel_shape")
        .ok_or_else(|| ParseError::MissingField {
            node: node.display_name().to_string(),
            what: "kernel_shape attribute",
        })?
        .as_usize_vec()?;
    let strides = node
        .attr("strides")
        .map(|a| a.as_usize_vec())
        .transpose()?
        .unwrap_or_else(|| vec![1, 1]);
    let group = node
        .attr("group")
        .map(|a| a.as_i64())
        .transpose()?
        .unwrap_or(1);

    let op = ConvOp::new(
        input(node, 0, "input X")?,
        input(node, 1, "input W")?,
        node.input.get(2).cloned(),
        output(node, 0, "output")?,
        dilations,
        pads,
        kernel_shape,
        strides,
        usize::try_from(group).unwrap_or(1),
    )?;
    Ok(Box::new(op))
}

fn build_max_pool(node: &NodeDoc) -> Result<Box<dyn Node>, ParseError> {
    let mut op = MaxPoolOp::new(
        input(node, 0, "input")?,
        output(node, 0, "output")?,
        required_kernel_shape(node)?,
    );
    if let Some(attr) = node.attr("strides") {
        op = op.with_strides(attr.as_usize_vec()?);
    }
    if let Some(attr) = node.attr("dilations") {
        op = op.with_dilations(attr.as_usize_vec()?);
    }
    if let Some(attr) = node.attr("pads") {
        op = op.with_pads(attr.as_usize_vec()?);
    }
    if let Some(attr) = node.attr("auto_pad") {
        op = op.with_auto_pad(parse_auto_pad(attr.as_str()?)?);
    }
    if let Some(attr) = node.attr("ceil_mode") {
        op = op.with_ceil_mode(attr.as_i64()? != 0);
    }
    if let Some(attr) = node.attr("storage_order") {
        op = op.with_column_major_indices(attr.as_i64()? != 0);
    }
    if let Some(indices) = node.output.get(1) {
        op = op.with_indices(indices.clone());
    }
    Ok(Box::new(op))
}

fn build_avg_pool(node: &NodeDoc) -> Result<Box<dyn Node>, ParseError> {
    let mut op = AvgPoolOp::new(
        input(node, 0, "input")?,
        output(node, 0, "output")?,
        required_kernel_shape(node)?,
    );
    if let Some(attr) = node.attr("strides") {
        op = op.with_strides(attr.as_usize_vec()?);
    }
    if let Some(attr) = node.attr("dilations") {
        op = op.with_dilations(attr.as_usize_vec()?);
    }
    if let Some(attr) = node.attr("pads") {
        op = op.with_pads(attr.as_usize_vec()?);
    }
    if let Some(attr) = node.attr("auto_pad") {
        op = op.with_auto_pad(parse_auto_pad(attr.as_str()?)?);
    }
    if let Some(attr) = node.attr("ceil_mode") {
        op = op.with_ceil_mode(attr.as_i64()? != 0);
    }
    if let Some(attr) = node.attr("count_include_pad") {
        op = op.with_count_include_pad(attr.as_i64()? != 0);
    }
    Ok(Box::new(op))
}

fn required_kernel_shape(node: &NodeDoc) -> Result<Vec<usize>, ParseError> {
    node.attr("kernel_shape")
        .ok_or_else(|| ParseError::MissingField {
            node: node.display_name().to_string(),
            what: "kernel_shape attribute",
        })?
        .as_usize_vec()
}

fn parse_auto_pad(s: &str) -> Result<kernels::AutoPad, ParseError> {
    s.parse().map_err(|e| ParseError::BadAttribute {
        name: "auto_pad".into(),
        detail: format!("{e}"),
    })
}

fn build_reshape(node: &NodeDoc) -> Result<Box<dyn Node>, ParseError> {
    let allow_zero = node
        .attr("allowzero")
        .map(|a| a.as_i64())
        .transpose()?
        .unwrap_or(0)
        != 0;
    Ok(Box::new(ReshapeOp::new(
        input(node, 0, "input data")?,
        input(node, 1, "input shape")?,
        output(node, 0, "output")?,
        allow_zero,
    )))
}

fn build_dropout(node: &NodeDoc) -> Result<Box<dyn Node>, ParseError> {
    let ratio = node.attr("ratio").map(|a| a.as_f32()).transpose()?.unwrap_or(0.5);
    let training_mode = node
        .attr("training_mode")
        .map(|a| a.as_i64())
        .transpose()?
        .unwrap_or(0)
        != 0;
    Ok(Box::new(DropoutOp::new(
        input(node, 0, "input")?,
        output(node, 0, "output")?,
        node.output.get(1).cloned(),
        ratio,
        training_mode,
    )))
}

fn build_constant(node: &NodeDoc) -> Result<Box<dyn Node>, ParseError> {
    let value = node
        .attr("value")
        .and_then(|a| a.t.as_ref())
        .ok_or_else(|| ParseError::MissingField {
            node: node.display_name().to_string(),
            what: "value tensor attribute",
        })?;
    Ok(Box::new(ConstantOp::new(
        output(node, 0, "output")?,
        decode_tensor(value)?,
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tensor_core::{DynTensor, Shape, Tensor};

    /// A two-layer perceptron head: Gemm + bias, ReLU, Flatten.
    const MLP_JSON: &str = r#"{
        "graph": {
            "initializer": [
                {
                    "name": "fc.w",
                    "dataType": 1,
                    "dims": ["2", "2"],
                    "floatData": [1.0, 0.0, 0.0, 1.0]
                },
                {
                    "name": "fc.b",
                    "dataType": 1,
                    "dims": ["2"],
                    "rawData": "AACAPwAAAEA="
                }
            ],
            "node": [
                {
                    "opType": "Gemm",
                    "input": ["x", "fc.w", "fc.b"],
                    "output": ["fc.out"],
                    "attribute": [
                        {"name": "alpha", "f": 1.0},
                        {"name": "beta", "f": 1.0}
                    ]
                },
                {
                    "opType": "Relu",
                    "input": ["fc.out"],
                    "output": ["y"]
                }
            ],
            "input": [{"name": "x"}],
            "output": [{"name": "y"}]
        }
    }"#;

    #[test]
    fn test_parse_and_infer_mlp() {
        let model = parse_str(MLP_JSON).unwrap();
        assert_eq!(model.num_nodes(), 2);
        assert_eq!(model.input_names(), ["x"]);
        assert_eq!(model.output_names(), ["y"]);

        let mut bindings = HashMap::new();
        bindings.insert(
            "x".to_string(),
            DynTensor::from(
                Tensor::from_vec(Shape::matrix(1, 2), vec![-5.0f32, 3.0]).unwrap(),
            ),
        );
        let outputs = model.infer(bindings).unwrap();
        match outputs.get("y").unwrap() {
            // Identity weights, bias [1, 2] from rawData, then ReLU.
            DynTensor::F32(t) => assert_eq!(t.data(), &[0.0, 5.0]),
            other => panic!("unexpected output {other:?}"),
        }
    }

    #[test]
    fn test_parse_pool_and_conv_attributes() {
        let json = r#"{
            "graph": {
                "node": [
                    {
                        "opType": "Conv",
                        "inputs": ["x", "w"],
                        "outputs": ["c"],
                        "attributes": [
                            {"name": "kernel_shape", "ints": ["2", "2"]},
                            {"name": "strides", "ints": [1, 1]},
                            {"name": "pads", "ints": [0, 0, 0, 0]},
                            {"name": "dilations", "ints": [1, 1]}
                        ]
                    },
                    {
                        "opType": "MaxPool",
                        "input": ["c"],
                        "output": ["y", "y.indices"],
                        "attribute": [
                            {"name": "kernel_shape", "ints": [2, 2]},
                            {"name": "strides", "ints": [2, 2]},
                            {"name": "auto_pad", "s": "NOTSET"},
                            {"name": "ceil_mode", "i": "0"}
                        ]
                    }
                ],
                "input": [{"name": "x"}],
                "output": [{"name": "y"}]
            }
        }"#;
        let model = parse_str(json).unwrap();
        assert_eq!(model.num_nodes(), 2);

        // The MaxPool node's second output is the argmax indices.
        let pool = model.iter_nodes().nth(1).unwrap();
        assert_eq!(pool.outputs(), vec!["y", "y.indices"]);
    }

    #[test]
    fn test_constant_node() {
        let json = r#"{
            "graph": {
                "node": [
                    {
                        "opType": "Constant",
                        "output": ["c"],
                        "attribute": [
                            {
                                "name": "value",
                                "t": {
                                    "dataType": 7,
                                    "dims": ["2"],
                                    "int64Data": ["4", "-1"]
                                }
                            }
                        ]
                    }
                ],
                "output": [{"name": "c"}]
            }
        }"#;
        let model = parse_str(json).unwrap();
        let outputs = model.infer(HashMap::new()).unwrap();
        match outputs.get("c").unwrap() {
            DynTensor::I64(t) => assert_eq!(t.data(), &[4, -1]),
            other => panic!("unexpected output {other:?}"),
        }
    }

    #[test]
    fn test_unsupported_op_type() {
        let json = r#"{
            "graph": {
                "node": [{"opType": "LSTM", "input": ["x"], "output": ["y"]}]
            }
        }"#;
        let err = parse_str(json).unwrap_err();
        assert!(matches!(err, ParseError::UnsupportedOp(ref op) if op == "LSTM"));
    }

    #[test]
    fn test_missing_required_input() {
        let json = r#"{
            "graph": {
                "node": [{"opType": "Add", "input": ["a"], "output": ["y"]}]
            }
        }"#;
        let err = parse_str(json).unwrap_err();
        assert!(matches!(
            err,
            ParseError::MissingField { what: "input B", .. }
        ));
    }

    #[test]
    fn test_conv_attribute_validation_propagates() {
        // Three stride values trip ConvOp's constructor validation.
        let json = r#"{
            "graph": {
                "node": [
                    {
                        "opType": "Conv",
                        "input": ["x", "w"],
                        "output": ["y"],
                        "attribute": [
                            {"name": "kernel_shape", "ints": [2, 2]},
                            {"name": "strides", "ints": [1, 1, 1]}
                        ]
                    }
                ]
            }
        }"#;
        let err = parse_str(json).unwrap_err();
        assert!(matches!(err, ParseError::Graph(_)));
    }

    #[test]
    fn test_bad_initializer_data_type() {
        let json = r#"{
            "graph": {
                "initializer": [
                    {"name": "w", "dataType": 10, "dims": [1], "floatData": [0.0]}
                ]
            }
        }"#;
        let err = parse_str(json).unwrap_err();
        // 10 is the ONNX float16 code, outside the supported set.
        assert!(matches!(err, ParseError::UnsupportedDataType { code: 10, .. }));
    }
}
