use escbox::container::{Container, Step};
use escbox::runtime::Runtime;
use escbox::{EscError, Result};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

/// The parts of a container the fake keeps.
#[derive(Debug, Clone)]
pub struct Seen {
    pub image: String,
    pub env: Vec<(String, String)>,
    pub secret_names: Vec<String>,
    pub steps: Vec<Step>,
}

impl Seen {
    pub fn env(&self, name: &str) -> Option<&str> {
        self.env
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }
}

/// A runtime that plays the part of `esc` against an in-memory environment.
///
/// Every container it receives is kept for inspection.
#[derive(Clone, Default)]
pub struct FakeEsc {
    pub config: Arc<Mutex<BTreeMap<String, String>>>,
    pub variables: Arc<Mutex<serde_json::Map<String, serde_json::Value>>>,
    pub seen: Arc<Mutex<Vec<Seen>>>,
    pub fail_with: Arc<Mutex<Option<String>>>,
}

impl FakeEsc {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_variable(self, name: &str, value: serde_json::Value) -> Self {
        self.variables
            .lock()
            .unwrap()
            .insert(name.to_string(), value);
        self
    }

    pub fn fail_next(&self, stderr: &str) {
        *self.fail_with.lock().unwrap() = Some(stderr.to_string());
    }

    pub fn seen(&self) -> Vec<Seen> {
        self.seen.lock().unwrap().clone()
    }
}

impl Runtime for FakeEsc {
    fn stdout(&self, container: &Container) -> Result<String> {
        self.seen.lock().unwrap().push(Seen {
            image: container.image().to_string(),
            env: container.env_variables().to_vec(),
            secret_names: container
                .secret_variables()
                .map(|(name, _)| name.to_string())
                .collect(),
            steps: container.steps().to_vec(),
        });

        if let Some(stderr) = self.fail_with.lock().unwrap().take() {
            return Err(EscError::ExecutionFailed {
                status: "exit status: 1".to_string(),
                stderr,
            });
        }

        let argv = match container.steps().last() {
            Some(Step::Exec(argv)) => argv.clone(),
            Some(Step::Pipeline(stages)) => stages[0].clone(),
            None => return Ok(String::new()),
        };

        match argv.get(2).map(String::as_str) {
            Some("get") => {
                let name = argv[4].trim_start_matches("pulumiConfig.");
                let config = self.config.lock().unwrap();
                Ok(format!(
                    "{}\n",
                    config.get(name).map(String::as_str).unwrap_or("null")
                ))
            }
            Some("set") => {
                let name = argv[4].trim_start_matches("pulumiConfig.");
                self.config
                    .lock()
                    .unwrap()
                    .insert(name.to_string(), argv[5].clone());
                Ok(String::new())
            }
            Some("open") => {
                let variables = self.variables.lock().unwrap();
                Ok(serde_json::to_string_pretty(&*variables)?)
            }
            _ => Ok(String::new()),
        }
    }

    fn name(&self) -> &'static str {
        "fake-esc"
    }
}
