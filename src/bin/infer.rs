//! Command line tool for inference

use std::path::PathBuf;

use anyhow::anyhow;
use burn::{backend::Autodiff, config::Config as _};
use burn_rhetoric::{
    config::Config,
    datasets::{rhetoric, LoadableDataset},
    inference::Inference,
    labels::Label,
    models::transformer::{multi_label, text_classification},
    pipelines::{ModelConfig, Pipeline},
    utils::{
        classes::label_positions,
        files::{self, BestModel},
    },
};
use pico_args::Arguments;

#[cfg(not(feature = "tch-gpu"))]
use burn::backend::{ndarray::NdArrayDevice, NdArray};

#[cfg(feature = "tch-gpu")]
use burn::backend::{libtorch::LibTorchDevice, LibTorch};

#[cfg(not(feature = "tch-gpu"))]
type Backend = Autodiff<NdArray>;

#[cfg(feature = "tch-gpu")]
type Backend = Autodiff<LibTorch>;

const HELP: &str = "\
Usage: infer [OPTIONS] [TEXT...]

Arguments:
  TEXT                 Texts to classify (defaults to random samples from the test split)

Options:
  -h, --help           Print help
  -c, --config         Path to the experiment config JSON file used for training
  -k, --checkpoint     Checkpoint to load instead of the recorded best model
  -s, --samples        Number of test samples to classify when no text is given (defaults to 10)
";

#[derive(Debug)]
struct Args {
    config: Option<String>,
    checkpoint: Option<PathBuf>,
    samples: usize,
    texts: Vec<String>,
}

fn parse_args() -> anyhow::Result<Option<Args>> {
    let mut pargs = Arguments::from_env();

    if pargs.contains(["-h", "--help"]) {
        return Ok(None);
    }

    let config = pargs.opt_value_from_str(["-c", "--config"])?;
    let checkpoint = pargs.opt_value_from_str(["-k", "--checkpoint"])?;
    let samples = pargs
        .opt_value_from_str(["-s", "--samples"])?
        .unwrap_or(10);

    let texts = pargs
        .finish()
        .into_iter()
        .map(|text| {
            text.into_string()
                .map_err(|text| anyhow!("Invalid UTF-8 input: {:?}", text))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    Ok(Some(Args {
        config,
        checkpoint,
        samples,
        texts,
    }))
}

/// Texts to classify, with the expected labels when they come from the test split
async fn inputs(config: &Config, args: &Args) -> anyhow::Result<(Vec<String>, Vec<Vec<usize>>)> {
    if !args.texts.is_empty() {
        return Ok((args.texts.clone(), Vec::new()));
    }

    let test = rhetoric::Dataset::load(
        &config.test_path(),
        &config.multi_data_headers,
        &config.multi_customized_headers,
    )
    .await?;

    Ok(test.samples(args.samples).into_iter().unzip())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    pretty_env_logger::init();

    let Some(args) = parse_args()? else {
        println!("{}", HELP);

        return Ok(());
    };

    let config = match &args.config {
        Some(path) => {
            Config::load(path).map_err(|e| anyhow!("Unable to load config file {}: {}", path, e))?
        }
        None => Config::new(),
    };

    let checkpoint = match &args.checkpoint {
        Some(checkpoint) => checkpoint.clone(),
        None => files::read_json::<BestModel>(&config.best_model_record())
            .await
            .map_err(|e| anyhow!("Unable to read the best model record: {}", e))?
            .path(),
    };

    #[cfg(not(feature = "tch-gpu"))]
    let device = NdArrayDevice::Cpu;

    #[cfg(feature = "tch-gpu")]
    let device = LibTorchDevice::Cuda(0);

    let (texts, expected) = inputs(&config, &args).await?;
    let positions = label_positions(&config.multi_customized_headers);
    let model_config_path = config.artifact_dir().join("config.json");

    match Pipeline::try_from(config.pipeline.as_str())? {
        Pipeline::TextClassification => {
            let model_config = text_classification::Config::load(&model_config_path)
                .map_err(|e| anyhow!("Unable to load model config: {}", e))?;

            let inference = Inference::<Backend, text_classification::Model<Backend>>::from_checkpoint(
                &model_config,
                &checkpoint,
                &device,
            )
            .await?;

            let prediction = inference.predict(&texts)?;
            let classes: Vec<Vec<usize>> = prediction.classes.iter().map(|c| vec![*c]).collect();
            let labels = inference.ids_to_labels(&classes)?;

            for (i, text) in texts.iter().enumerate() {
                println!(
                    "\n=== Item {i} ===\
                     \n- Text: {text}\
                     \n- Class: {}\
                     \n- Probabilities: {:?}",
                    labels[i].join(", "),
                    prediction.probabilities[i]
                );

                let expected = expected.get(i).and_then(|labels| {
                    let column = model_config.label_columns().into_iter().next()?;

                    positions.get(&column).map(|position| labels[*position])
                });

                if let Some(expected) = expected {
                    println!("- Expected: {}", expected);
                }
            }
        }
        Pipeline::MultiLabel => {
            let model_config = multi_label::Config::load(&model_config_path)
                .map_err(|e| anyhow!("Unable to load model config: {}", e))?;

            let inference = Inference::<Backend, multi_label::Model<Backend>>::from_checkpoint(
                &model_config,
                &checkpoint,
                &device,
            )
            .await?;

            let prediction = inference.predict_multi(&texts)?;

            for (i, text) in texts.iter().enumerate() {
                println!("\n=== Item {i} ===\n- Text: {text}");

                for label in Label::ALL {
                    let class = prediction.get(label)[i];

                    let expected = expected.get(i).and_then(|labels| {
                        positions
                            .get(label.as_str())
                            .map(|position| labels[*position])
                    });

                    match expected {
                        Some(expected) => println!("- {label}: {class} (expected {expected})"),
                        None => println!("- {label}: {class}"),
                    }
                }
            }
        }
    }

    Ok(())
}
