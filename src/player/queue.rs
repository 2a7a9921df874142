use parking_lot::Mutex;
use rand::seq::SliceRandom;
use std::collections::VecDeque;
use tokio::sync::Notify;
use tracing::{debug, info};

use crate::{error::PlayerError, player::track::Track};

/// Canciones por página al listar la cola.
pub const PAGE_SIZE: usize = 10;

/// Cola FIFO de canciones pendientes de una sesión.
///
/// Todas las operaciones son seguras ante comandos concurrentes; una cola
/// vacía es un estado normal, nunca un error. El lazo de reproducción espera
/// en [`TrackQueue::wait`] hasta que alguien encole.
#[derive(Debug, Default)]
pub struct TrackQueue {
    items: Mutex<VecDeque<Track>>,
    notify: Notify,
}

impl TrackQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Encola al final y despierta al consumidor en espera. Siempre tiene
    /// éxito.
    pub fn push(&self, track: Track) {
        info!("➕ Agregado a la cola: {}", track.title);
        self.items.lock().push_back(track);
        self.notify.notify_one();
    }

    /// Saca la primera canción; `None` si por ahora no hay nada.
    pub fn pop(&self) -> Option<Track> {
        self.items.lock().pop_front()
    }

    /// Elimina la canción en `position` (1-based) y desplaza el resto.
    pub fn remove(&self, position: usize) -> Result<Track, PlayerError> {
        let mut items = self.items.lock();
        let len = items.len();
        if position < 1 || position > len {
            return Err(PlayerError::OutOfRange { position, len });
        }

        let removed = items
            .remove(position - 1)
            .ok_or(PlayerError::OutOfRange { position, len })?;
        debug!("❌ Canción eliminada en posición {}", position);
        Ok(removed)
    }

    /// Mezcla la cola de manera uniforme; sin efecto con menos de dos
    /// canciones.
    pub fn shuffle(&self) {
        let mut items = self.items.lock();
        if items.len() < 2 {
            return;
        }

        let mut shuffled: Vec<Track> = items.drain(..).collect();
        shuffled.shuffle(&mut rand::thread_rng());
        items.extend(shuffled);
        info!("🔀 Cola mezclada");
    }

    /// Vacía la cola de inmediato.
    pub fn clear(&self) {
        self.items.lock().clear();
        info!("🗑️ Cola limpiada");
    }

    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    #[allow(dead_code)]
    pub fn is_empty(&self) -> bool {
        self.items.lock().is_empty()
    }

    /// Página 1-based de la cola. Una página fuera de rango devuelve una
    /// lista vacía; una cola vacía reporta cero páginas.
    pub fn page(&self, page: usize, per_page: usize) -> QueuePage {
        let items = self.items.lock();
        let total = items.len();
        let total_pages = if total == 0 {
            0
        } else {
            (total + per_page - 1) / per_page
        };

        let page = page.max(1);
        let start = (page - 1) * per_page;
        let slice = if start < total {
            items.iter().skip(start).take(per_page).cloned().collect()
        } else {
            Vec::new()
        };

        QueuePage {
            items: slice,
            page,
            total_pages,
            total,
        }
    }

    /// Suspende hasta que haya al menos una canción encolada. No consume la
    /// canción: el consumidor debe volver a intentar [`TrackQueue::pop`].
    pub async fn wait(&self) {
        self.notify.notified().await;
    }
}

/// Una página de la cola tal como la ve el usuario.
#[derive(Debug, Clone)]
pub struct QueuePage {
    pub items: Vec<Track>,
    pub page: usize,
    pub total_pages: usize,
    pub total: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serenity::model::id::UserId;

    fn track(n: usize) -> Track {
        Track::new(
            format!("canción {n}"),
            format!("https://example.com/{n}"),
            UserId::new(100 + n as u64),
        )
    }

    fn filled(n: usize) -> TrackQueue {
        let queue = TrackQueue::new();
        for i in 1..=n {
            queue.push(track(i));
        }
        queue
    }

    #[test]
    fn pop_preserves_fifo_order() {
        let queue = filled(3);
        assert_eq!(queue.pop().map(|t| t.title), Some("canción 1".to_string()));
        assert_eq!(queue.pop().map(|t| t.title), Some("canción 2".to_string()));
        assert_eq!(queue.pop().map(|t| t.title), Some("canción 3".to_string()));
        assert_eq!(queue.pop(), None);
    }

    #[test]
    fn pages_reproduce_enqueue_order() {
        let queue = filled(25);

        let mut seen = Vec::new();
        for page in 1..=3 {
            let listed = queue.page(page, PAGE_SIZE);
            assert_eq!(listed.total_pages, 3);
            assert_eq!(listed.total, 25);
            seen.extend(listed.items.into_iter().map(|t| t.title));
        }

        let expected: Vec<String> = (1..=25).map(|n| format!("canción {n}")).collect();
        assert_eq!(seen, expected);
    }

    #[test]
    fn page_beyond_range_is_empty_not_an_error() {
        let queue = filled(5);
        let listed = queue.page(4, PAGE_SIZE);
        assert!(listed.items.is_empty());
        assert_eq!(listed.total_pages, 1);
    }

    #[test]
    fn empty_queue_lists_zero_pages() {
        let queue = TrackQueue::new();
        let listed = queue.page(1, PAGE_SIZE);
        assert!(listed.items.is_empty());
        assert_eq!(listed.total_pages, 0);
        assert_eq!(listed.total, 0);
    }

    #[test]
    fn remove_keeps_relative_order() {
        let queue = filled(5);
        let removed = queue.remove(3).unwrap();
        assert_eq!(removed.title, "canción 3");

        let remaining: Vec<String> = queue
            .page(1, PAGE_SIZE)
            .items
            .into_iter()
            .map(|t| t.title)
            .collect();
        assert_eq!(
            remaining,
            vec!["canción 1", "canción 2", "canción 4", "canción 5"]
        );
    }

    #[test]
    fn remove_out_of_range_leaves_queue_untouched() {
        let queue = filled(3);

        for position in [0, 4, 99] {
            let err = queue.remove(position).unwrap_err();
            assert!(matches!(
                err,
                PlayerError::OutOfRange { position: p, len: 3 } if p == position
            ));
        }

        assert_eq!(queue.len(), 3);
        let titles: Vec<String> = queue
            .page(1, PAGE_SIZE)
            .items
            .into_iter()
            .map(|t| t.title)
            .collect();
        assert_eq!(titles, vec!["canción 1", "canción 2", "canción 3"]);
    }

    #[test]
    fn shuffle_is_a_permutation_of_the_same_tracks() {
        let queue = filled(20);
        queue.shuffle();

        let mut titles: Vec<String> = queue
            .page(1, PAGE_SIZE)
            .items
            .into_iter()
            .chain(queue.page(2, PAGE_SIZE).items)
            .map(|t| t.title)
            .collect();
        titles.sort();

        let mut expected: Vec<String> = (1..=20).map(|n| format!("canción {n}")).collect();
        expected.sort();
        assert_eq!(titles, expected);
    }

    #[test]
    fn shuffle_on_single_track_is_a_noop() {
        let queue = filled(1);
        queue.shuffle();
        assert_eq!(queue.pop().map(|t| t.title), Some("canción 1".to_string()));
    }

    #[test]
    fn clear_empties_immediately() {
        let queue = filled(10);
        queue.clear();
        assert!(queue.is_empty());
        assert_eq!(queue.pop(), None);
    }

    #[tokio::test]
    async fn wait_wakes_up_on_push() {
        let queue = std::sync::Arc::new(TrackQueue::new());

        let waiter = queue.clone();
        let handle = tokio::spawn(async move {
            waiter.wait().await;
            waiter.pop()
        });

        queue.push(track(1));
        let popped = tokio::time::timeout(std::time::Duration::from_secs(2), handle)
            .await
            .expect("el consumidor nunca despertó")
            .unwrap();
        assert_eq!(popped.map(|t| t.title), Some("canción 1".to_string()));
    }
}
