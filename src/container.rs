//! Description of an ephemeral execution container.
//!
//! A [`Container`] is plain data: a base image, environment, secret
//! environment and an ordered list of commands. Nothing runs until a
//! [`Runtime`](crate::runtime::Runtime) executes it.

use secrecy::SecretString;
use serde::Serialize;
use std::fmt;

/// One command run inside the container.
///
/// Arguments are kept as separate strings; they are quoted only when the
/// step is rendered into a shell script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Step {
    /// A single program with its arguments.
    Exec(Vec<String>),
    /// Programs whose stdout feeds the next one's stdin.
    Pipeline(Vec<Vec<String>>),
}

impl Step {
    fn render(&self) -> String {
        match self {
            Step::Exec(argv) => shell_words::join(argv),
            Step::Pipeline(stages) => stages
                .iter()
                .map(shell_words::join)
                .collect::<Vec<_>>()
                .join(" | "),
        }
    }
}

pub struct Container {
    image: String,
    env: Vec<(String, String)>,
    secrets: Vec<(String, SecretString)>,
    steps: Vec<Step>,
}

#[derive(Serialize)]
struct CacheKey<'a> {
    image: &'a str,
    env: &'a [(String, String)],
    secrets: Vec<&'a str>,
    steps: &'a [Step],
}

impl Container {
    pub fn from(image: impl Into<String>) -> Self {
        Self {
            image: image.into(),
            env: Vec::new(),
            secrets: Vec::new(),
            steps: Vec::new(),
        }
    }

    /// Sets a plain environment variable, replacing any earlier value.
    pub fn with_env_variable(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        let value = value.into();
        match self.env.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = value,
            None => self.env.push((name, value)),
        }
        self
    }

    /// Exposes `secret` to every step as the environment variable `name`.
    pub fn with_secret_variable(mut self, name: impl Into<String>, secret: SecretString) -> Self {
        let name = name.into();
        self.secrets.retain(|(n, _)| *n != name);
        self.secrets.push((name, secret));
        self
    }

    pub fn with_exec<I, S>(mut self, argv: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.steps
            .push(Step::Exec(argv.into_iter().map(Into::into).collect()));
        self
    }

    pub fn with_pipeline<I, A, S>(mut self, stages: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let stages = stages
            .into_iter()
            .map(|argv| argv.into_iter().map(Into::into).collect())
            .collect();
        self.steps.push(Step::Pipeline(stages));
        self
    }

    pub fn image(&self) -> &str {
        &self.image
    }

    pub fn env_variables(&self) -> &[(String, String)] {
        &self.env
    }

    pub fn env_variable(&self, name: &str) -> Option<&str> {
        self.env
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn secret_variables(&self) -> impl Iterator<Item = (&str, &SecretString)> {
        self.secrets.iter().map(|(n, s)| (n.as_str(), s))
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Renders the steps as a POSIX shell script that stops at the first failure.
    pub fn render_script(&self) -> String {
        let mut script = String::from("set -e\nset -o pipefail\n");
        for step in &self.steps {
            script.push_str(&step.render());
            script.push('\n');
        }
        script
    }

    /// Identity of the container for result caching.
    ///
    /// Covers everything that can change the output except secret values,
    /// which are represented by their variable names only.
    pub fn cache_key(&self) -> String {
        let key = CacheKey {
            image: &self.image,
            env: &self.env,
            secrets: self.secrets.iter().map(|(n, _)| n.as_str()).collect(),
            steps: &self.steps,
        };
        serde_json::to_string(&key).unwrap_or_else(|_| format!("{:?}", self))
    }
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let secret_names: Vec<&str> = self.secrets.iter().map(|(n, _)| n.as_str()).collect();
        f.debug_struct("Container")
            .field("image", &self.image)
            .field("env", &self.env)
            .field("secrets", &secret_names)
            .field("steps", &self.steps)
            .finish()
    }
}
