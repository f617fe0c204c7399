//! Shared fixtures for the integration tests.

use flate2::Compression;
use flate2::write::GzEncoder;
use kiln_training::{DatasetId, SolverJob, SolverJobId};
use tar::Builder;

pub const SOLVER: &str = r#"# LeNet solver
net: "examples/mnist/lenet_train_test.prototxt"
test_iter: 100
base_lr: 0.01
lr_policy: "inv"
max_iter: 10000
snapshot_prefix: "examples/mnist/lenet"
solver_mode: GPU
"#;

pub const NET: &str = r#"name: "LeNet"
layer {
  name: "mnist"
  type: "ImageData"
  top: "data"
  top: "label"
  include {
    phase: TRAIN
  }
  image_data_param {
    source: "examples/images/train.txt"
    batch_size: 64
  }
}
layer {
  name: "mnist"
  type: "ImageData"
  top: "data"
  top: "label"
  include {
    phase: TEST
  }
  image_data_param {
    source: "examples/images/test.txt"
    batch_size: 100
  }
}
layer {
  name: "ip1"
  type: "InnerProduct"
  bottom: "data"
  top: "ip1"
}
"#;

pub const SOLVER_URL: &str = "http://configs.local/lenet_solver.prototxt";
pub const NET_URL: &str = "http://configs.local/lenet_train_test.prototxt";

pub fn create_test_archive(files: &[(&str, &[u8])]) -> Vec<u8> {
    let enc = GzEncoder::new(Vec::new(), Compression::default());
    let mut tar = Builder::new(enc);
    for (path, data) in files {
        let mut header = tar::Header::new_gnu();
        header.set_size(data.len() as u64);
        header.set_mode(0o644);
        tar.append_data(&mut header, path, *data).unwrap();
    }
    tar.into_inner().unwrap().finish().unwrap()
}

pub fn create_test_job(id: &str, dataset: &str) -> SolverJob {
    SolverJob {
        id: SolverJobId::from(id),
        revision: 0,
        dataset_id: DatasetId::from(dataset),
        specification_url: SOLVER_URL.to_string(),
        specification_net_url: NET_URL.to_string(),
    }
}
