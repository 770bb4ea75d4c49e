use serde_json::{json, Value};

use crate::error::ChainError;
use crate::model::Address;

/// Deterministic address of the first contract deployed on a fresh local node.
const DEFAULT_CONTRACT_ADDRESS: &str = "0x5FbDB2315678afecb367f032d93F642f64180aa3";

pub fn default_contract_address() -> &'static str {
    option_env!("TASKCHAIN_CONTRACT_ADDRESS").unwrap_or(DEFAULT_CONTRACT_ADDRESS)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mutability {
    View,
    NonPayable,
}

impl Mutability {
    fn as_str(self) -> &'static str {
        match self {
            Mutability::View => "view",
            Mutability::NonPayable => "nonpayable",
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct AbiParam {
    pub name: &'static str,
    pub kind: &'static str,
    pub internal_type: &'static str,
    pub indexed: bool,
    pub components: &'static [AbiParam],
}

impl AbiParam {
    const fn new(name: &'static str, kind: &'static str, internal_type: &'static str) -> Self {
        Self {
            name,
            kind,
            internal_type,
            indexed: false,
            components: &[],
        }
    }

    fn to_json(&self, with_indexed: bool) -> Value {
        let mut value = json!({
            "internalType": self.internal_type,
            "name": self.name,
            "type": self.kind,
        });
        if with_indexed {
            value["indexed"] = json!(self.indexed);
        }
        if !self.components.is_empty() {
            value["components"] = Value::Array(
                self.components.iter().map(|c| c.to_json(false)).collect(),
            );
        }
        value
    }
}

#[derive(Debug, Clone, Copy)]
pub struct MethodSpec {
    pub name: &'static str,
    pub inputs: &'static [AbiParam],
    pub outputs: &'static [AbiParam],
    pub mutability: Mutability,
}

impl MethodSpec {
    pub fn signature(&self) -> String {
        signature(self.name, self.inputs)
    }

    pub fn is_mutating(&self) -> bool {
        self.mutability == Mutability::NonPayable
    }
}

#[derive(Debug, Clone, Copy)]
pub struct EventSpec {
    pub name: &'static str,
    pub inputs: &'static [AbiParam],
}

impl EventSpec {
    pub fn signature(&self) -> String {
        signature(self.name, self.inputs)
    }
}

fn signature(name: &str, params: &[AbiParam]) -> String {
    let kinds: Vec<&str> = params.iter().map(|p| p.kind).collect();
    format!("{}({})", name, kinds.join(","))
}

const TASK_TUPLE: &[AbiParam] = &[
    AbiParam::new("id", "uint256", "uint256"),
    AbiParam::new("title", "string", "string"),
    AbiParam::new("description", "string", "string"),
    AbiParam::new("status", "uint8", "enum TaskManager.TaskStatus"),
    AbiParam::new("owner", "address", "address"),
];

const METHODS: &[MethodSpec] = &[
    MethodSpec {
        name: "addTask",
        inputs: &[
            AbiParam::new("_title", "string", "string"),
            AbiParam::new("_description", "string", "string"),
        ],
        outputs: &[],
        mutability: Mutability::NonPayable,
    },
    MethodSpec {
        name: "deleteTask",
        inputs: &[AbiParam::new("_taskId", "uint256", "uint256")],
        outputs: &[],
        mutability: Mutability::NonPayable,
    },
    MethodSpec {
        name: "editTask",
        inputs: &[
            AbiParam::new("_taskId", "uint256", "uint256"),
            AbiParam::new("_title", "string", "string"),
            AbiParam::new("_description", "string", "string"),
        ],
        outputs: &[],
        mutability: Mutability::NonPayable,
    },
    MethodSpec {
        name: "getTask",
        inputs: &[],
        outputs: &[AbiParam {
            name: "",
            kind: "tuple[]",
            internal_type: "struct TaskManager.Task[]",
            indexed: false,
            components: TASK_TUPLE,
        }],
        mutability: Mutability::View,
    },
    MethodSpec {
        name: "getTaskCounter",
        inputs: &[],
        outputs: &[AbiParam::new("", "uint256", "uint256")],
        mutability: Mutability::View,
    },
    MethodSpec {
        name: "markTaskCompleted",
        inputs: &[AbiParam::new("_taskId", "uint256", "uint256")],
        outputs: &[],
        mutability: Mutability::NonPayable,
    },
];

const EVENTS: &[EventSpec] = &[
    EventSpec {
        name: "TaskCreated",
        inputs: &[
            AbiParam::new("taskId", "uint256", "uint256"),
            AbiParam::new("title", "string", "string"),
            AbiParam::new("description", "string", "string"),
            AbiParam::new("owner", "address", "address"),
        ],
    },
    EventSpec {
        name: "TaskDeleted",
        inputs: &[AbiParam::new("taskId", "uint256", "uint256")],
    },
    EventSpec {
        name: "TaskUpdated",
        inputs: &[
            AbiParam::new("taskId", "uint256", "uint256"),
            AbiParam::new("title", "string", "string"),
            AbiParam::new("description", "string", "string"),
            AbiParam::new("status", "uint8", "enum TaskManager.TaskStatus"),
        ],
    },
];

/// Static description of the deployed `TaskManager` contract: its methods,
/// its events and where it lives.
#[derive(Debug, Clone)]
pub struct ContractDescriptor {
    pub name: &'static str,
    pub address: Address,
    pub methods: &'static [MethodSpec],
    pub events: &'static [EventSpec],
}

impl ContractDescriptor {
    pub fn task_manager(address: Address) -> Self {
        Self {
            name: "TaskManager",
            address,
            methods: METHODS,
            events: EVENTS,
        }
    }

    pub fn task_manager_default() -> Result<Self, ChainError> {
        Ok(Self::task_manager(Address::parse(default_contract_address())?))
    }

    pub fn method(&self, name: &str) -> Option<&MethodSpec> {
        self.methods.iter().find(|m| m.name == name)
    }

    pub fn event(&self, name: &str) -> Option<&EventSpec> {
        self.events.iter().find(|e| e.name == name)
    }

    /// Standard JSON ABI array, events first then functions.
    pub fn abi_json(&self) -> Value {
        let events = self.events.iter().map(|e| {
            json!({
                "anonymous": false,
                "inputs": e.inputs.iter().map(|p| p.to_json(true)).collect::<Vec<_>>(),
                "name": e.name,
                "type": "event",
            })
        });
        let methods = self.methods.iter().map(|m| {
            json!({
                "inputs": m.inputs.iter().map(|p| p.to_json(false)).collect::<Vec<_>>(),
                "name": m.name,
                "outputs": m.outputs.iter().map(|p| p.to_json(false)).collect::<Vec<_>>(),
                "stateMutability": m.mutability.as_str(),
                "type": "function",
            })
        });
        Value::Array(events.chain(methods).collect())
    }
}
