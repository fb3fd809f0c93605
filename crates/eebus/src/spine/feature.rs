// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Entities and features of the local device tree.

use crate::spine::function::Function;
use crate::spine::model::{FunctionType, PossibleOperations, Role};

/// A functional unit on an entity, addressed as
/// `(device, entity path, feature index)`.
#[derive(Debug)]
pub struct Feature {
    number: u32,
    feature_type: u32,
    role: Role,
    description: Option<String>,
    functions: Vec<Function>,
}

impl Feature {
    pub fn new(number: u32, feature_type: u32, role: Role) -> Self {
        Self {
            number,
            feature_type,
            role,
            description: None,
            functions: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = Some(description.to_owned());
        self
    }

    pub fn with_function(mut self, function_type: FunctionType, operations: PossibleOperations) -> Self {
        self.functions.push(Function::new(function_type, operations));
        self
    }

    pub fn number(&self) -> u32 {
        self.number
    }

    pub fn feature_type(&self) -> u32 {
        self.feature_type
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn functions(&self) -> &[Function] {
        &self.functions
    }

    pub fn function(&self, function_type: FunctionType) -> Option<&Function> {
        self.functions
            .iter()
            .find(|f| f.function_type() == function_type)
    }

    pub fn function_mut(&mut self, function_type: FunctionType) -> Option<&mut Function> {
        self.functions
            .iter_mut()
            .find(|f| f.function_type() == function_type)
    }
}

/// An ordered list of features under one entity address path.
#[derive(Debug)]
pub struct Entity {
    address: Vec<u32>,
    entity_type: u32,
    features: Vec<Feature>,
}

impl Entity {
    pub fn new(address: Vec<u32>, entity_type: u32) -> Self {
        Self {
            address,
            entity_type,
            features: Vec::new(),
        }
    }

    pub fn address(&self) -> &[u32] {
        &self.address
    }

    pub fn entity_type(&self) -> u32 {
        self.entity_type
    }

    pub fn features(&self) -> &[Feature] {
        &self.features
    }

    pub fn add_feature(&mut self, feature: Feature) -> usize {
        self.features.push(feature);
        self.features.len() - 1
    }

    pub fn feature_by_number(&self, number: u32) -> Option<(usize, &Feature)> {
        self.features
            .iter()
            .enumerate()
            .find(|(_, f)| f.number() == number)
    }

    pub fn feature_mut(&mut self, index: usize) -> Option<&mut Feature> {
        self.features.get_mut(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feature_lookup() {
        let mut entity = Entity::new(vec![1], 2);
        entity.add_feature(
            Feature::new(0, 0, Role::Special)
                .with_function(
                    FunctionType::NodeManagementDetailedDiscoveryData,
                    PossibleOperations::read_only(),
                ),
        );
        entity.add_feature(Feature::new(3, 4, Role::Server));

        assert_eq!(entity.feature_by_number(3).map(|(i, _)| i), Some(1));
        assert!(entity.feature_by_number(7).is_none());

        let (_, nm) = entity.feature_by_number(0).unwrap();
        assert!(nm
            .function(FunctionType::NodeManagementDetailedDiscoveryData)
            .is_some());
        assert!(nm.function(FunctionType::MeasurementListData).is_none());
    }
}
