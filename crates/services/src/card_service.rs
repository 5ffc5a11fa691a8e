use log::info;

use pharma_core::model::DrugCard;
use storage::repository::StudyRepository;

use crate::error::CardServiceError;

/// User-added cards and per-card memos.
///
/// Custom cards are merged after the static deck when a session opens; a custom card
/// whose name is already in the deck is skipped there.
#[derive(Clone)]
pub struct CardService {
    repo: StudyRepository,
}

impl CardService {
    #[must_use]
    pub fn new(repo: StudyRepository) -> Self {
        Self { repo }
    }

    /// List the stored custom cards.
    ///
    /// # Errors
    ///
    /// Returns `CardServiceError::Storage` if repository access fails.
    pub async fn list_custom_cards(&self) -> Result<Vec<DrugCard>, CardServiceError> {
        Ok(self.repo.get_custom_cards().await?)
    }

    /// Validate and store a new custom card.
    ///
    /// # Errors
    ///
    /// Returns `CardServiceError::Card` for an invalid card,
    /// `CardServiceError::Duplicate` if a custom card with that name exists, and
    /// `CardServiceError::Storage` if persistence fails.
    pub async fn add_custom_card(&self, card: DrugCard) -> Result<DrugCard, CardServiceError> {
        let card = card.validate()?;
        let mut cards = self.repo.get_custom_cards().await?;
        if cards.iter().any(|existing| existing.name == card.name) {
            return Err(CardServiceError::Duplicate(card.name));
        }
        cards.push(card.clone());
        self.repo.set_custom_cards(&cards).await?;
        info!("added custom card {:?}", card.name);
        Ok(card)
    }

    /// Remove a custom card. Returns whether it existed.
    ///
    /// # Errors
    ///
    /// Returns `CardServiceError::Storage` if repository access fails.
    pub async fn remove_custom_card(&self, name: &str) -> Result<bool, CardServiceError> {
        let mut cards = self.repo.get_custom_cards().await?;
        let before = cards.len();
        cards.retain(|card| card.name != name);
        if cards.len() == before {
            return Ok(false);
        }
        self.repo.set_custom_cards(&cards).await?;
        Ok(true)
    }

    /// Memo for `name`, `""` when none.
    ///
    /// # Errors
    ///
    /// Returns `CardServiceError::Storage` if repository access fails.
    pub async fn memo(&self, name: &str) -> Result<String, CardServiceError> {
        Ok(self.repo.get_memo(name).await?)
    }

    /// Store the memo for `name`; blank text deletes it.
    ///
    /// # Errors
    ///
    /// Returns `CardServiceError::Storage` if persistence fails.
    pub async fn save_memo(&self, name: &str, text: &str) -> Result<(), CardServiceError> {
        self.repo.set_memo(name, text).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pharma_core::model::Importance;

    #[tokio::test]
    async fn custom_cards_are_validated_and_unique() {
        let service = CardService::new(StudyRepository::in_memory());

        let added = service
            .add_custom_card(
                DrugCard::new("  Tirzepatide ", "GIP/GLP-1 agonist", Importance::High)
                    .with_mechanism(""),
            )
            .await
            .unwrap();
        assert_eq!(added.name, "Tirzepatide");
        assert_eq!(added.mechanism, None);

        assert!(matches!(
            service
                .add_custom_card(DrugCard::new("Tirzepatide", "Again", Importance::Low))
                .await,
            Err(CardServiceError::Duplicate(_))
        ));
        assert!(matches!(
            service
                .add_custom_card(DrugCard::new(" ", "Blank", Importance::Low))
                .await,
            Err(CardServiceError::Card(_))
        ));
        assert_eq!(service.list_custom_cards().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn remove_custom_card_reports_presence() {
        let service = CardService::new(StudyRepository::in_memory());
        service
            .add_custom_card(DrugCard::new("Semaglutide", "GLP-1 agonist", Importance::High))
            .await
            .unwrap();

        assert!(service.remove_custom_card("Semaglutide").await.unwrap());
        assert!(!service.remove_custom_card("Semaglutide").await.unwrap());
        assert!(service.list_custom_cards().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn memos_are_stored_per_card() {
        let service = CardService::new(StudyRepository::in_memory());
        service.save_memo("Lithium", "narrow therapeutic index").await.unwrap();
        assert_eq!(service.memo("Lithium").await.unwrap(), "narrow therapeutic index");
        assert_eq!(service.memo("Valproate").await.unwrap(), "");
    }
}
