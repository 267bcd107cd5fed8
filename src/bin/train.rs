//! Command line tool to trigger training

use anyhow::anyhow;
use burn::{backend::Autodiff, config::Config as _};
use burn_rhetoric::{config::Config, training::driver};
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
Usage: train [PIPELINE] [OPTIONS]

Arguments:
  PIPELINE             The pipeline to use ('multi-label' or 'text-classification')

Options:
  -h, --help           Print help
  -c, --config         Path to an experiment config JSON file
  -l, --label-column   The label column for the 'text-classification' pipeline
  -n, --num-epochs     Number of epochs to train for
  -b, --batch-size     Batch size
  -d, --data-dir       The path to the processed data directory (defaults to 'data/processed')
  -m, --model          Hugging Face model id or local directory (defaults to 'bert-base-uncased')
  --no-pretrained      Initialize the encoder randomly instead of loading pretrained weights
  --no-tui             Disable TUI
";

#[derive(Debug)]
struct Args {
    pipeline: Option<String>,
    config: Option<String>,
    label_column: Option<String>,
    num_epochs: Option<usize>,
    batch_size: Option<usize>,
    data_dir: Option<String>,
    model: Option<String>,
    pretrained: bool,
    use_tui: bool,
}

impl Args {
    fn parse() -> anyhow::Result<Option<Self>> {
        let mut pargs = Arguments::from_env();

        // Help has a higher priority and should be handled separately.
        if pargs.contains(["-h", "--help"]) {
            return Ok(None);
        }

        let args = Args {
            config: pargs.opt_value_from_str(["-c", "--config"])?,
            label_column: pargs.opt_value_from_str(["-l", "--label-column"])?,
            num_epochs: pargs.opt_value_from_str(["-n", "--num-epochs"])?,
            batch_size: pargs.opt_value_from_str(["-b", "--batch-size"])?,
            data_dir: pargs.opt_value_from_str(["-d", "--data-dir"])?,
            model: pargs.opt_value_from_str(["-m", "--model"])?,
            pretrained: !(pargs.contains("--no-pretrained")),
            use_tui: !(pargs.contains("--no-tui")),
            pipeline: pargs.opt_free_from_str()?,
        };

        Ok(Some(args))
    }

    /// Load the experiment config and apply command line overrides
    fn config(&self) -> anyhow::Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::load(path)
                .map_err(|e| anyhow!("Unable to load config file {}: {}", path, e))?,
            None => Config::new(),
        };

        if let Some(pipeline) = &self.pipeline {
            config.pipeline = pipeline.clone();
        }

        if let Some(label_column) = &self.label_column {
            config.label_column = Some(label_column.clone());
        }

        if let Some(num_epochs) = self.num_epochs {
            config.n_epochs = num_epochs;
        }

        if let Some(batch_size) = self.batch_size {
            config.batch_size = batch_size;
        }

        if let Some(data_dir) = &self.data_dir {
            config.processed_data_dir = data_dir.clone();
        }

        if let Some(model) = &self.model {
            config.lm_model_path = model.clone();
        }

        if !self.pretrained {
            config.load_pretrained = false;
        }

        if !self.use_tui {
            config.use_tui = false;
        }

        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    pretty_env_logger::init();

    let Some(args) = Args::parse()? else {
        print!("{}", HELP);

        return Ok(());
    };

    let config = args.config()?;

    #[cfg(not(feature = "tch-gpu"))]
    let device = NdArrayDevice::Cpu;

    #[cfg(feature = "tch-gpu")]
    let device = LibTorchDevice::Cuda(0);

    let best_model_path = driver::run::<Backend>(config, vec![device]).await?;

    println!("Best model path: {}", best_model_path.display());

    Ok(())
}
