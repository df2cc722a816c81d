#![deny(unsafe_code)]

use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use anyhow::anyhow;
use config::{Config, ConfigBuilder, File};
use once_cell::sync::OnceCell;
use serde::Deserialize;

use mqprops_codec::{DuplicatePolicy, Unpacker, MAX_VARIABLE_LENGTH};

use self::logging::Log;

pub use self::options::Options;

pub mod logging;
pub mod options;

pub type Result<T, E = anyhow::Error> = anyhow::Result<T, E>;

static SETTINGS: OnceCell<Settings> = OnceCell::new();

#[derive(Clone)]
pub struct Settings(Arc<Inner>);

#[derive(Debug, Clone, Deserialize)]
pub struct Inner {
    #[serde(default)]
    pub log: Log,
    #[serde(default)]
    pub codec: Codec,
    #[serde(default, skip)]
    pub opts: Options,
}

impl Deref for Settings {
    type Target = Inner;
    fn deref(&self) -> &Self::Target {
        self.0.as_ref()
    }
}

impl Settings {
    fn new(opts: Options) -> Result<Self> {
        let mut builder = Config::builder()
            .add_source(File::with_name("/etc/mqprops/mqprops").required(false))
            .add_source(File::with_name("mqprops").required(false))
            .add_source(config::Environment::with_prefix("mqprops").separator("__").try_parsing(true));

        if let Some(cfg) = opts.cfg_name.as_ref() {
            builder = builder.add_source(File::with_name(cfg).required(true));
        }

        Self::build(builder, opts)
    }

    fn build(builder: ConfigBuilder<config::builder::DefaultState>, opts: Options) -> Result<Self> {
        let mut inner: Inner = builder.build()?.try_deserialize()?;
        inner.codec.check()?;

        //Command line configuration overriding file configuration
        if let Some(level) = opts.log_level {
            inner.log.level = level;
        }

        inner.opts = opts;
        Ok(Self(Arc::new(inner)))
    }

    #[inline]
    pub fn instance() -> &'static Self {
        match SETTINGS.get() {
            Some(c) => c,
            None => {
                unreachable!("Settings not initialized");
            }
        }
    }

    #[inline]
    pub fn init(opts: Options) -> Result<&'static Self> {
        SETTINGS.set(Settings::new(opts)?).map_err(|_| anyhow!("Settings init failed"))?;
        SETTINGS.get().ok_or_else(|| anyhow!("Settings init failed"))
    }

    #[inline]
    pub fn logs() {
        let cfg = Self::instance();
        log::debug!("Config info is {:?}", cfg.0);
        log::info!("log config is: {:?}", cfg.log);
        log::info!("codec config is: {:?}", cfg.codec);
    }
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Settings ...")?;
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Codec {
    //Handling of a single-occurrence property received twice, "reject" or "overwrite".
    #[serde(default)]
    pub duplicate_properties: DuplicatePolicy,
    //Largest property block accepted, in bytes.
    #[serde(default = "Codec::max_block_size_default")]
    pub max_block_size: u32,
}

impl Default for Codec {
    #[inline]
    fn default() -> Self {
        Self { duplicate_properties: DuplicatePolicy::default(), max_block_size: Self::max_block_size_default() }
    }
}

impl Codec {
    fn max_block_size_default() -> u32 {
        MAX_VARIABLE_LENGTH
    }

    fn check(&self) -> Result<()> {
        if self.max_block_size > MAX_VARIABLE_LENGTH {
            return Err(anyhow!(
                "codec.max_block_size is {}, the largest encodable block is {}",
                self.max_block_size,
                MAX_VARIABLE_LENGTH
            ));
        }
        Ok(())
    }

    /// Unpacker configured by this section.
    #[inline]
    pub fn unpacker(&self) -> Unpacker {
        Unpacker::new().duplicates(self.duplicate_properties).max_block_size(self.max_block_size)
    }
}
