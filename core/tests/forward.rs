//! End-to-end forward passes through engine-built graphs.

use quiver_core::record::{OpRecord, ParamValue};
use quiver_core::{Graph, OpRegistry};
use quiver_data::tensor::Tensor;
use std::collections::HashMap;

fn no_weights() -> HashMap<String, Tensor> {
    HashMap::new()
}

#[test]
fn row_join_of_two_matrices() {
    // (2,3) over (1,3) along axis 1 gives (3,3): first two rows from the
    // first input, third row from the second
    let reg = OpRegistry::with_builtins();
    let records = vec![
        OpRecord::new("pnnx.Input", "input_0").with_outputs(&["a"]),
        OpRecord::new("pnnx.Input", "input_1").with_outputs(&["b"]),
        OpRecord::new("torch.cat", "cat_0")
            .with_param("dim", ParamValue::Int(1))
            .with_inputs(&["a", "b"])
            .with_outputs(&["joined"]),
        OpRecord::new("pnnx.Output", "output_0").with_inputs(&["joined"]),
    ];
    let mut graph = Graph::build(&records, &no_weights(), &reg).unwrap();

    // column-major buffers for [[0,1,2],[4,5,6]] and [[-1,-2,-3]]
    let a = Tensor::from_vec(&[2, 3], vec![0., 4., 1., 5., 2., 6.]);
    let b = Tensor::from_vec(&[1, 3], vec![-1., -2., -3.]);
    graph.set_inputs("a", vec![a.clone()]).unwrap();
    graph.set_inputs("b", vec![b.clone()]).unwrap();
    graph.forward().unwrap();

    let outputs = graph.outputs("joined").unwrap();
    assert_eq!(outputs.len(), 1);
    let out = outputs[0];
    assert_eq!(out.shape(), &[3, 3]);
    for w in 0..3 {
        assert_eq!(out.at(0, 0, w), a.at(0, 0, w));
        assert_eq!(out.at(0, 1, w), a.at(0, 1, w));
        assert_eq!(out.at(0, 2, w), b.at(0, 0, w));
    }
}

#[test]
fn channel_join_of_four_cubes_into_two() {
    // four (6,32,32) tensors, concatenated with 2 outputs along the channel
    // axis: two (12,32,32) outputs, each the contiguous append of its two
    // round-robin assigned inputs
    let reg = OpRegistry::with_builtins();
    let records = vec![
        OpRecord::new("pnnx.Input", "input_0").with_outputs(&["left"]),
        OpRecord::new("pnnx.Input", "input_1").with_outputs(&["right"]),
        OpRecord::new("torch.cat", "cat_0")
            .with_param("dim", ParamValue::Int(1))
            .with_inputs(&["left", "right"])
            .with_outputs(&["joined"]),
        OpRecord::new("pnnx.Output", "output_0").with_inputs(&["joined"]),
    ];
    let mut graph = Graph::build(&records, &no_weights(), &reg).unwrap();

    let mut tensors: Vec<Tensor> = Vec::new();
    for _ in 0..4 {
        let mut t = Tensor::zeros(&[6, 32, 32]);
        t.rand_normal();
        tensors.push(t);
    }
    graph.set_inputs("left", vec![tensors[0].clone(), tensors[1].clone()]).unwrap();
    graph.set_inputs("right", vec![tensors[2].clone(), tensors[3].clone()]).unwrap();
    graph.forward().unwrap();

    let outputs = graph.outputs("joined").unwrap();
    assert_eq!(outputs.len(), 2);
    for (i, out) in outputs.iter().enumerate() {
        assert_eq!(out.chw(), (12, 32, 32));
        for ch in 0..6 {
            assert_eq!(out.slice(ch), tensors[i].slice(ch));
            assert_eq!(out.slice(ch + 6), tensors[i + 2].slice(ch));
        }
    }
}

#[test]
fn upscaler_pipeline() {
    // pixel-shuffle into an activation into a resize, driven end to end
    let reg = OpRegistry::with_builtins();
    let records = vec![
        OpRecord::new("pnnx.Input", "input_0").with_outputs(&["in"]),
        OpRecord::new("nn.PixelShuffle", "shuffle_0")
            .with_param("upscale_factor", ParamValue::Int(2))
            .with_inputs(&["in"])
            .with_outputs(&["shuffled"]),
        OpRecord::new("nn.LeakyRelu", "lrelu_0")
            .with_param("negative_slope", ParamValue::Float(0.2))
            .with_inputs(&["shuffled"])
            .with_outputs(&["activated"]),
        OpRecord::new("F.upsample_nearest", "up_0")
            .with_param("scale_factor", ParamValue::FloatArray(vec![2.0, 2.0]))
            .with_inputs(&["activated"])
            .with_outputs(&["out"]),
        OpRecord::new("pnnx.Output", "output_0").with_inputs(&["out"]),
    ];
    let mut graph = Graph::build(&records, &no_weights(), &reg).unwrap();

    let mut input = Tensor::zeros(&[4, 3, 3]);
    input.rand_normal();
    graph.set_inputs("in", vec![input.clone()]).unwrap();
    graph.forward().unwrap();

    let out = graph.outputs("out").unwrap()[0];
    assert_eq!(out.chw(), (1, 12, 12));
    // spot-check the composition at the origin
    let shuffled = input.at(0, 0, 0);
    let activated = if shuffled >= 0.0 { shuffled } else { shuffled * 0.2 };
    assert_eq!(out.at(0, 0, 0), activated);

    // a second pass over fresh inputs reuses the allocated buffers
    let ptr = out.as_slice().as_ptr();
    let mut second = Tensor::zeros(&[4, 3, 3]);
    second.rand_normal();
    graph.set_inputs("in", vec![second]).unwrap();
    graph.forward().unwrap();
    assert_eq!(graph.outputs("out").unwrap()[0].as_slice().as_ptr(), ptr);
}
