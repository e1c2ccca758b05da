/// Offer/answer position of one link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NegotiationState {
    #[default]
    Stable,
    HaveLocalOffer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NegotiationInput {
    CreateOffer,
    RemoteOffer,
    RemoteAnswer,
}

impl NegotiationState {
    /// Transition table. `None` means the input is not legal here and must be
    /// dropped without touching the link.
    pub fn next(self, input: NegotiationInput) -> Option<NegotiationState> {
        use NegotiationInput::*;
        use NegotiationState::*;

        match (self, input) {
            (Stable, CreateOffer) => Some(HaveLocalOffer),
            (Stable, RemoteOffer) => Some(Stable),
            (HaveLocalOffer, RemoteAnswer) => Some(Stable),
            _ => None,
        }
    }
}
