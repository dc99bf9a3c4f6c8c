use {
	crate::{
		error::ConfigError,
		mapping::{buildMappings, ColorMapping},
	},
	serde::Deserialize,
	std::{fs, path::{Path, PathBuf}},
};

/// Settings read from `--config FILE`. Command-line flags take precedence.
#[derive(Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Config {
	pub input: Option<PathBuf>,
	pub output: Option<PathBuf>,
	pub threads: Option<usize>,

	#[serde(default)]
	pub mappings: Vec<String>,
}

impl Config {
	pub fn load(path: &Path) -> Result<Self, ConfigError> {
		let toml = fs::read_to_string(path).map_err(|err| ConfigError::Read(path.to_owned(), err))?;
		toml::from_str(&toml).map_err(|err| ConfigError::Parse(path.to_owned(), err))
	}

	pub fn colorMapping(&self) -> Result<ColorMapping, ConfigError> {
		Ok(buildMappings(&self.mappings)?)
	}
}

#[cfg(test)]
mod tests {
	use {super::*, crate::error::MappingError};

	#[test]
	fn parses_every_field() {
		let config: Config = toml::from_str(
			r##"
				input = "in"
				output = "out"
				threads = 4
				mappings = ["#ff00d9=>#0abab5", "fff:000"]
			"##,
		)
		.unwrap();
		assert_eq!(config.input.as_deref(), Some(Path::new("in")));
		assert_eq!(config.output.as_deref(), Some(Path::new("out")));
		assert_eq!(config.threads, Some(4));
		let mapping = config.colorMapping().unwrap();
		assert_eq!(mapping.get("#ff00d9"), Some("#0abab5"));
		assert_eq!(mapping.get("#ffffff"), Some("#000000"));
	}

	#[test]
	fn everything_is_optional() {
		assert_eq!(toml::from_str::<Config>("").unwrap(), Config::default());
	}

	#[test]
	fn rejects_unknown_keys() {
		assert!(toml::from_str::<Config>("mapping = []").is_err());
	}

	#[test]
	fn bad_mapping_surfaces_as_mapping_error() {
		let config = Config { mappings: vec!["nope".to_owned()], ..Config::default() };
		assert!(matches!(
			config.colorMapping(),
			Err(ConfigError::Mapping(MappingError::InvalidMappingSyntax(spec))) if spec == "nope"
		));
	}

	#[test]
	fn missing_file_names_the_path() {
		let path = Path::new("/nonexistent/recolor.toml");
		let err = Config::load(path).unwrap_err();
		assert!(matches!(err, ConfigError::Read(ref p, _) if p == path));
		assert!(err.to_string().contains("recolor.toml"));
	}
}
