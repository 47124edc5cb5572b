use std::{collections::HashMap, fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// Production stage of a carpet order.
///
/// The enum names every stage code the portal has ever stored. Which of
/// them are in use, and in what order, is decided by a [`StageVocabulary`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Stage {
    OrderApproval,
    YarnIssued,
    Rendering,
    Dyeing,
    DyeingReady,
    WaitingForLoom,
    Onloom,
    OnloomProgress,
    Offloom,
    Finishing,
    DeliveryTime,
    FirstRevisedDeliveryDate,
    SecondRevisedDeliveryDate,
    IssuedToSupplier,
    CarpetReceived,
    Exported,
}

impl Stage {
    pub const ALL: [Stage; 16] = [
        Stage::OrderApproval,
        Stage::YarnIssued,
        Stage::Rendering,
        Stage::Dyeing,
        Stage::DyeingReady,
        Stage::WaitingForLoom,
        Stage::Onloom,
        Stage::OnloomProgress,
        Stage::Offloom,
        Stage::Finishing,
        Stage::DeliveryTime,
        Stage::FirstRevisedDeliveryDate,
        Stage::SecondRevisedDeliveryDate,
        Stage::IssuedToSupplier,
        Stage::CarpetReceived,
        Stage::Exported,
    ];

    /// Stored code, e.g. `ONLOOM_PROGRESS`
    pub fn code(self) -> &'static str {
        match self {
            Stage::OrderApproval => "ORDER_APPROVAL",
            Stage::YarnIssued => "YARN_ISSUED",
            Stage::Rendering => "RENDERING",
            Stage::Dyeing => "DYEING",
            Stage::DyeingReady => "DYEING_READY",
            Stage::WaitingForLoom => "WAITING_FOR_LOOM",
            Stage::Onloom => "ONLOOM",
            Stage::OnloomProgress => "ONLOOM_PROGRESS",
            Stage::Offloom => "OFFLOOM",
            Stage::Finishing => "FINISHING",
            Stage::DeliveryTime => "DELIVERY_TIME",
            Stage::FirstRevisedDeliveryDate => "FIRST_REVISED_DELIVERY_DATE",
            Stage::SecondRevisedDeliveryDate => "SECOND_REVISED_DELIVERY_DATE",
            Stage::IssuedToSupplier => "ISSUED_TO_SUPPLIER",
            Stage::CarpetReceived => "CARPET_RECEIVED",
            Stage::Exported => "EXPORTED",
        }
    }

    /// Human readable label shown to clients
    pub fn label(self) -> &'static str {
        match self {
            Stage::OrderApproval => "Order Approval",
            Stage::YarnIssued => "Yarn Issued",
            Stage::Rendering => "Rendering",
            Stage::Dyeing => "Dyeing",
            Stage::DyeingReady => "Dyeing Ready",
            Stage::WaitingForLoom => "Waiting for Loom",
            Stage::Onloom => "On Loom",
            Stage::OnloomProgress => "On Loom Progress",
            Stage::Offloom => "Off Loom",
            Stage::Finishing => "Finishing",
            Stage::DeliveryTime => "Ready for Delivery",
            Stage::FirstRevisedDeliveryDate => "First Revised Date",
            Stage::SecondRevisedDeliveryDate => "Second Revised Date",
            Stage::IssuedToSupplier => "Issued to Supplier",
            Stage::CarpetReceived => "Carpet Received",
            Stage::Exported => "Exported",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Stage::OrderApproval => "The order has been received and is awaiting approval.",
            Stage::YarnIssued => "Raw materials have been selected and issued for production.",
            Stage::Rendering => "The design is being rendered into a weaving map.",
            Stage::Dyeing => "Yarn is being dyed according to the color specifications.",
            Stage::DyeingReady => "Dyed yarn is ready for weaving.",
            Stage::WaitingForLoom => "The order is queued for a free loom.",
            Stage::Onloom => "Weaving has started on the loom.",
            Stage::OnloomProgress => "Weaving is in progress.",
            Stage::Offloom => "The carpet has been taken off the loom.",
            Stage::Finishing => "The carpet is undergoing final finishing touches.",
            Stage::DeliveryTime => "The carpet is ready and scheduled for delivery.",
            Stage::FirstRevisedDeliveryDate => "The delivery date has been revised once.",
            Stage::SecondRevisedDeliveryDate => "The delivery date has been revised a second time.",
            Stage::IssuedToSupplier => "Materials have been sent to the weaving facility.",
            Stage::CarpetReceived => "The woven carpet has been received from the supplier.",
            Stage::Exported => "The carpet has been shipped and is on its way to you.",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("Unknown stage code: {0}")]
pub struct UnknownStage(pub String);

impl FromStr for Stage {
    type Err = UnknownStage;

    /// Exact code match only; free text goes through the status normalizer.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Stage::ALL
            .into_iter()
            .find(|stage| stage.code() == s)
            .ok_or_else(|| UnknownStage(s.to_string()))
    }
}

/// Built-in vocabularies selectable through configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VocabularyKind {
    Production,
    Legacy,
}

#[derive(Debug, thiserror::Error)]
#[error("Unknown stage vocabulary: {0}")]
pub struct UnknownVocabulary(pub String);

impl FromStr for VocabularyKind {
    type Err = UnknownVocabulary;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "production" => Ok(Self::Production),
            "legacy" => Ok(Self::Legacy),
            _ => Err(UnknownVocabulary(s.trim().to_string())),
        }
    }
}

/// The ordered stage sequence plus the alias table used to read stored
/// status text.
///
/// Ranks follow the sequence index. Terminal stages (the revised delivery
/// dates) rank after the whole sequence but never appear on a timeline.
#[derive(Debug, Clone)]
pub struct StageVocabulary {
    sequence: Vec<Stage>,
    terminal: Vec<Stage>,
    delivery_anchored: Vec<Stage>,
    aliases: HashMap<String, Stage>,
}

impl StageVocabulary {
    /// Builds one of the built-in vocabularies. Every stage's own code is
    /// registered as an alias; `sequence` is never empty.
    ///
    /// Alias keys are expected in normalized form (upper case, underscores).
    fn new(
        sequence: Vec<Stage>,
        terminal: Vec<Stage>,
        delivery_anchored: Vec<Stage>,
        aliases: &[(&str, Stage)],
    ) -> Self {
        let mut table: HashMap<String, Stage> = sequence
            .iter()
            .chain(terminal.iter())
            .map(|stage| (stage.code().to_string(), *stage))
            .collect();
        for (alias, stage) in aliases {
            table.insert((*alias).to_string(), *stage);
        }

        Self {
            sequence,
            terminal,
            delivery_anchored,
            aliases: table,
        }
    }

    /// Current production vocabulary (approval through delivery)
    pub fn production() -> Self {
        Self::new(
            vec![
                Stage::OrderApproval,
                Stage::Rendering,
                Stage::Dyeing,
                Stage::DyeingReady,
                Stage::WaitingForLoom,
                Stage::Onloom,
                Stage::OnloomProgress,
                Stage::Offloom,
                Stage::Finishing,
                Stage::DeliveryTime,
            ],
            vec![
                Stage::FirstRevisedDeliveryDate,
                Stage::SecondRevisedDeliveryDate,
            ],
            vec![Stage::Finishing, Stage::DeliveryTime],
            &[
                ("ORDER_ISSUED", Stage::OrderApproval),
                ("APPROVAL", Stage::OrderApproval),
                ("YARN_ISSUED", Stage::Rendering),
                ("WAITING_LOOM", Stage::WaitingForLoom),
                ("ON_LOOM", Stage::Onloom),
                ("ON_LOOM_PROGRESS", Stage::OnloomProgress),
                ("OFF_LOOM", Stage::Offloom),
                ("DELIVERY", Stage::DeliveryTime),
                ("READY_FOR_DELIVERY", Stage::DeliveryTime),
                ("FIRST_REVISED_DATE", Stage::FirstRevisedDeliveryDate),
                ("SECOND_REVISED_DATE", Stage::SecondRevisedDeliveryDate),
            ],
        )
    }

    /// First-generation vocabulary (yarn issue through export)
    pub fn legacy() -> Self {
        Self::new(
            vec![
                Stage::YarnIssued,
                Stage::Dyeing,
                Stage::IssuedToSupplier,
                Stage::CarpetReceived,
                Stage::Finishing,
                Stage::Exported,
            ],
            Vec::new(),
            vec![Stage::Finishing, Stage::Exported],
            &[
                ("ORDER_ISSUED", Stage::YarnIssued),
                ("DELIVERY", Stage::Exported),
            ],
        )
    }

    pub fn from_kind(kind: VocabularyKind) -> Self {
        match kind {
            VocabularyKind::Production => Self::production(),
            VocabularyKind::Legacy => Self::legacy(),
        }
    }

    /// Canonical timeline sequence, rank ascending
    pub fn sequence(&self) -> &[Stage] {
        &self.sequence
    }

    pub fn terminal(&self) -> &[Stage] {
        &self.terminal
    }

    /// Lowest-rank stage, used when stored status text is not recognized
    pub fn first(&self) -> Stage {
        self.sequence[0]
    }

    pub fn rank(&self, stage: Stage) -> Option<usize> {
        if let Some(index) = self.sequence.iter().position(|s| *s == stage) {
            return Some(index);
        }
        self.terminal
            .iter()
            .position(|s| *s == stage)
            .map(|index| self.sequence.len() + index)
    }

    pub fn contains(&self, stage: Stage) -> bool {
        self.rank(stage).is_some()
    }

    pub fn is_delivery_anchored(&self, stage: Stage) -> bool {
        self.delivery_anchored.contains(&stage)
    }

    /// Looks up an already normalized key
    pub fn lookup(&self, key: &str) -> Option<Stage> {
        self.aliases.get(key).copied()
    }

    /// Sequence followed by terminal stages, with their ranks
    pub fn ranked(&self) -> impl Iterator<Item = (usize, Stage)> + '_ {
        self.sequence
            .iter()
            .chain(self.terminal.iter())
            .copied()
            .enumerate()
    }
}

impl Default for StageVocabulary {
    fn default() -> Self {
        Self::production()
    }
}
