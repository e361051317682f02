use std::sync::Arc;

use alloy::primitives::{b256, keccak256, B256};
use log::trace;
use rlp::{Prototype, Rlp, RlpStream};

use crate::{
    db::DB,
    errors::TrieError,
    nibbles::Nibbles,
    node::{empty_children, BranchNode, Node},
    proof,
};

pub type TrieResult<T> = Result<T, TrieError>;
const HASHED_LENGTH: usize = 32;

/// The root hash of a trie with no entries, `keccak256(rlp(""))`.
pub const EMPTY_ROOT: B256 =
    b256!("56e81f171bcc55a6ff8345e692c0f86e5b48e01b996cadc001622fb5e363b421");

pub trait Trie<D: DB> {
    /// Returns the value for key stored in the trie.
    fn get(&self, key: &[u8]) -> TrieResult<Option<Vec<u8>>>;

    /// Checks that the key is present in the trie
    fn contains(&self, key: &[u8]) -> TrieResult<bool>;

    /// Inserts value into trie and modifies it if it exists. Inserting an empty value removes the key.
    fn insert(&mut self, key: &[u8], value: &[u8]) -> TrieResult<()>;

    /// Removes any existing value for key from the trie.
    fn remove(&mut self, key: &[u8]) -> TrieResult<bool>;

    /// Writes all new nodes to the db and returns the root hash of the trie.
    fn root_hash(&mut self) -> TrieResult<B256>;

    /// Constructs a merkle proof for key. The result contains the encodings of all nodes that are stored by hash on
    /// the path to the value at key, starting with the root. Nodes inlined in their parent are not repeated.
    ///
    /// If the trie does not contain a value for key, the returned proof contains all nodes of the longest existing
    /// prefix of the key (at least the root node), ending with the node that proves the absence of the key.
    fn get_proof(&self, key: &[u8]) -> TrieResult<Vec<Vec<u8>>>;

    /// Returns the value if key exists, None if key does not exist, and an error if the proof is wrong.
    fn verify_proof(
        &self,
        root_hash: B256,
        key: &[u8],
        proof: Vec<Vec<u8>>,
    ) -> TrieResult<Option<Vec<u8>>>;
}

pub struct EthTrie<D>
where
    D: DB,
{
    root: Node,
    root_hash: B256,

    pub db: Arc<D>,
}

impl<D: DB> Clone for EthTrie<D> {
    fn clone(&self) -> Self {
        EthTrie {
            root: self.root.clone(),
            root_hash: self.root_hash,
            db: self.db.clone(),
        }
    }
}

enum EncodedNode {
    Hash(B256),
    Inline(Vec<u8>),
}

impl<D> EthTrie<D>
where
    D: DB,
{
    pub fn new(db: Arc<D>) -> Self {
        Self {
            root: Node::Empty,
            root_hash: EMPTY_ROOT,
            db,
        }
    }

    /// Opens the trie committed under `root_hash`, sharing this trie's database. Nodes are loaded lazily.
    pub fn at_root(&self, root_hash: B256) -> Self {
        Self {
            root: Node::Hash(root_hash),
            root_hash,
            db: self.db.clone(),
        }
    }
}

impl<D> Trie<D> for EthTrie<D>
where
    D: DB,
{
    fn get(&self, key: &[u8]) -> TrieResult<Option<Vec<u8>>> {
        let path = Nibbles::from_raw(key);
        self.get_at(&self.root, &path, 0)
            .map_err(|e| e.with_key(key))
    }

    fn contains(&self, key: &[u8]) -> TrieResult<bool> {
        Ok(self.get(key)?.is_some())
    }

    fn insert(&mut self, key: &[u8], value: &[u8]) -> TrieResult<()> {
        if value.is_empty() {
            self.remove(key)?;
            return Ok(());
        }
        let path = Nibbles::from_raw(key);
        self.root = self
            .insert_at(self.root.clone(), &path, 0, value.to_vec())
            .map_err(|e| e.with_key(key))?;
        Ok(())
    }

    fn remove(&mut self, key: &[u8]) -> TrieResult<bool> {
        let path = Nibbles::from_raw(key);
        let (root, removed) = self
            .delete_at(&self.root, &path, 0)
            .map_err(|e| e.with_key(key))?;
        self.root = root;
        Ok(removed)
    }

    fn root_hash(&mut self) -> TrieResult<B256> {
        self.commit()
    }

    fn get_proof(&self, key: &[u8]) -> TrieResult<Vec<Vec<u8>>> {
        // Work on a committed copy so that every node on the path is addressable by hash.
        let mut committed = self.clone();
        let root_hash = committed.commit()?;

        let path = Nibbles::from_raw(key);
        let mut proof = Vec::new();
        committed
            .get_path_at(&Node::Hash(root_hash), &path, 0, &mut proof)
            .map_err(|e| e.with_key(key))?;
        Ok(proof)
    }

    fn verify_proof(
        &self,
        root_hash: B256,
        key: &[u8],
        proof: Vec<Vec<u8>>,
    ) -> TrieResult<Option<Vec<u8>>> {
        Ok(proof::read_proof(root_hash, key, &proof)?)
    }
}

impl<D> EthTrie<D>
where
    D: DB,
{
    fn get_at(
        &self,
        source_node: &Node,
        path: &Nibbles,
        path_index: usize,
    ) -> TrieResult<Option<Vec<u8>>> {
        let partial = &path[path_index..];
        match source_node {
            Node::Empty => Ok(None),
            Node::Leaf(leaf) => Ok((leaf.key.as_slice() == partial).then(|| leaf.value.clone())),
            Node::Branch(branch) => match partial.first() {
                None => Ok(branch.value.clone()),
                Some(&index) => {
                    self.get_at(&branch.children[index as usize], path, path_index + 1)
                }
            },
            Node::Extension(extension) => {
                if partial.starts_with(extension.prefix.as_slice()) {
                    self.get_at(&extension.node, path, path_index + extension.prefix.len())
                } else {
                    Ok(None)
                }
            }
            Node::Hash(hash) => {
                let node = self.resolve(*hash)?;
                self.get_at(&node, path, path_index)
            }
        }
    }

    fn insert_at(
        &self,
        n: Node,
        path: &Nibbles,
        path_index: usize,
        value: Vec<u8>,
    ) -> TrieResult<Node> {
        let partial = path.offset(path_index);
        match n {
            Node::Empty => Ok(Node::from_leaf(partial, value)),
            Node::Leaf(leaf) => {
                let match_index = partial.common_prefix(&leaf.key);
                if match_index == leaf.key.len() && match_index == partial.len() {
                    return Ok(Node::from_leaf(partial, value));
                }

                let mut branch = BranchNode::empty();
                branch.insert_leaf(leaf.key.offset(match_index), leaf.value.clone());
                branch.insert_leaf(partial.offset(match_index), value);
                let branch = Node::Branch(Arc::new(branch));

                if match_index == 0 {
                    return Ok(branch);
                }

                // if include a common prefix
                Ok(Node::from_extension(partial.slice(0, match_index), branch))
            }
            Node::Branch(mut branch) => {
                match partial.first() {
                    None => Arc::make_mut(&mut branch).value = Some(value),
                    Some(&index) => {
                        let index = index as usize;
                        let child = branch.children[index].clone();
                        let new_child = self.insert_at(child, path, path_index + 1, value)?;
                        Arc::make_mut(&mut branch).children[index] = new_child;
                    }
                }
                Ok(Node::Branch(branch))
            }
            Node::Extension(ext) => {
                let prefix = &ext.prefix;
                let match_index = partial.common_prefix(prefix);

                if match_index == prefix.len() {
                    let new_node =
                        self.insert_at(ext.node.clone(), path, path_index + match_index, value)?;
                    return Ok(Node::from_extension(prefix.clone(), new_node));
                }

                // Split the extension at the first differing nibble.
                let mut branch = BranchNode::empty();
                let rest = prefix.offset(match_index + 1);
                branch.children[prefix[match_index] as usize] = if rest.is_empty() {
                    ext.node.clone()
                } else {
                    Node::from_extension(rest, ext.node.clone())
                };
                let branch = self.insert_at(
                    Node::Branch(Arc::new(branch)),
                    path,
                    path_index + match_index,
                    value,
                )?;

                if match_index == 0 {
                    Ok(branch)
                } else {
                    Ok(Node::from_extension(prefix.slice(0, match_index), branch))
                }
            }
            Node::Hash(hash) => {
                let node = self.resolve(hash)?;
                self.insert_at(node, path, path_index, value)
            }
        }
    }

    fn delete_at(
        &self,
        old_node: &Node,
        path: &Nibbles,
        path_index: usize,
    ) -> TrieResult<(Node, bool)> {
        let partial = &path[path_index..];
        let unchanged = || Ok((old_node.clone(), false));
        match old_node {
            Node::Empty => Ok((Node::Empty, false)),
            Node::Leaf(leaf) => {
                if leaf.key.as_slice() == partial {
                    Ok((Node::Empty, true))
                } else {
                    unchanged()
                }
            }
            Node::Branch(branch) => {
                let mut updated = BranchNode::clone(branch);
                match partial.first() {
                    None => {
                        if updated.value.take().is_none() {
                            return unchanged();
                        }
                    }
                    Some(&index) => {
                        let index = index as usize;
                        let (child, removed) =
                            self.delete_at(&branch.children[index], path, path_index + 1)?;
                        if !removed {
                            return unchanged();
                        }
                        updated.children[index] = child;
                    }
                }
                Ok((self.degenerate(Node::Branch(Arc::new(updated)))?, true))
            }
            Node::Extension(ext) => {
                if !partial.starts_with(ext.prefix.as_slice()) {
                    return unchanged();
                }
                let (child, removed) =
                    self.delete_at(&ext.node, path, path_index + ext.prefix.len())?;
                if !removed {
                    return unchanged();
                }
                let n = Node::from_extension(ext.prefix.clone(), child);
                Ok((self.degenerate(n)?, true))
            }
            Node::Hash(hash) => {
                let node = self.resolve(*hash)?;
                let (n, removed) = self.delete_at(&node, path, path_index)?;
                if removed {
                    Ok((n, true))
                } else {
                    unchanged()
                }
            }
        }
    }

    /// Restores the canonical shape of a node after one of its descendants was removed. Branches with a single
    /// entry collapse into leaves or extensions, and extensions absorb extensions or leaves below them.
    fn degenerate(&self, n: Node) -> TrieResult<Node> {
        match n {
            Node::Branch(branch) => {
                if branch.is_childless() {
                    return Ok(match &branch.value {
                        Some(value) => Node::from_leaf(Nibbles::default(), value.clone()),
                        None => Node::Empty,
                    });
                }
                match (branch.single_child(), &branch.value) {
                    (Some(index), None) => {
                        let child = self.load(&branch.children[index])?;
                        self.degenerate(Node::from_extension(
                            Nibbles::from_hex(&[index as u8]),
                            child,
                        ))
                    }
                    _ => Ok(Node::Branch(branch)),
                }
            }
            Node::Extension(ext) => {
                let child = self.load(&ext.node)?;
                match &child {
                    Node::Empty => Ok(Node::Empty),
                    Node::Leaf(leaf) => Ok(Node::from_leaf(
                        ext.prefix.join(&leaf.key),
                        leaf.value.clone(),
                    )),
                    Node::Extension(inner) => Ok(Node::from_extension(
                        ext.prefix.join(&inner.prefix),
                        inner.node.clone(),
                    )),
                    Node::Branch(_) | Node::Hash(_) => {
                        Ok(Node::from_extension(ext.prefix.clone(), child))
                    }
                }
            }
            other => Ok(other),
        }
    }

    // Collects the encodings of the nodes along the key that are referenced by hash. Inlined nodes are already
    // contained in their parent's encoding, so only nodes loaded from the db are added.
    fn get_path_at(
        &self,
        source_node: &Node,
        path: &Nibbles,
        path_index: usize,
        proof: &mut Vec<Vec<u8>>,
    ) -> TrieResult<()> {
        let partial = &path[path_index..];
        match source_node {
            Node::Empty | Node::Leaf(_) => Ok(()),
            Node::Branch(branch) => match partial.first() {
                None => Ok(()),
                Some(&index) => self.get_path_at(
                    &branch.children[index as usize],
                    path,
                    path_index + 1,
                    proof,
                ),
            },
            Node::Extension(ext) => {
                if partial.starts_with(ext.prefix.as_slice()) {
                    self.get_path_at(&ext.node, path, path_index + ext.prefix.len(), proof)
                } else {
                    Ok(())
                }
            }
            Node::Hash(hash) => {
                let encoded = self.load_encoded(*hash)?;
                let node = Self::decode_node(&encoded)?;
                proof.push(encoded);
                self.get_path_at(&node, path, path_index, proof)
            }
        }
    }

    fn commit(&mut self) -> TrieResult<B256> {
        let mut batch = Vec::new();
        let root_hash = match Self::write_node(&self.root, &mut batch) {
            EncodedNode::Hash(hash) => hash,
            EncodedNode::Inline(encoded) => {
                // The root is always stored, even when it is small enough to be inlined.
                let hash = keccak256(&encoded);
                batch.push((hash.to_vec(), encoded));
                hash
            }
        };

        trace!("committing {} trie nodes under root {root_hash}", batch.len());
        self.db
            .insert_batch(batch)
            .map_err(|e| TrieError::DB(e.to_string()))?;

        self.root_hash = root_hash;
        self.root = self.resolve(root_hash)?;
        Ok(root_hash)
    }

    fn write_node(to_encode: &Node, batch: &mut Vec<(Vec<u8>, Vec<u8>)>) -> EncodedNode {
        // Returns the hash value directly to avoid double counting.
        if let Node::Hash(hash) = to_encode {
            return EncodedNode::Hash(*hash);
        }

        let data = Self::encode_raw(to_encode, batch);
        // Nodes smaller than 32 bytes are stored inside their parent,
        // Nodes equal to 32 bytes are returned directly
        if data.len() < HASHED_LENGTH {
            EncodedNode::Inline(data)
        } else {
            let hash = keccak256(&data);
            batch.push((hash.to_vec(), data));
            EncodedNode::Hash(hash)
        }
    }

    fn encode_raw(node: &Node, batch: &mut Vec<(Vec<u8>, Vec<u8>)>) -> Vec<u8> {
        let mut append_child = |stream: &mut RlpStream, child: &Node| {
            match Self::write_node(child, batch) {
                EncodedNode::Hash(hash) => stream.append(&hash.as_slice()),
                EncodedNode::Inline(data) => stream.append_raw(&data, 1),
            };
        };

        match node {
            Node::Empty => rlp::NULL_RLP.to_vec(),
            Node::Leaf(leaf) => {
                let mut stream = RlpStream::new_list(2);
                stream.append(&leaf.key.encode_compact(true));
                stream.append(&leaf.value);
                stream.out().to_vec()
            }
            Node::Branch(branch) => {
                let mut stream = RlpStream::new_list(17);
                for child in &branch.children {
                    append_child(&mut stream, child);
                }

                match &branch.value {
                    Some(v) => stream.append(v),
                    None => stream.append_empty_data(),
                };
                stream.out().to_vec()
            }
            Node::Extension(ext) => {
                let mut stream = RlpStream::new_list(2);
                stream.append(&ext.prefix.encode_compact(false));
                append_child(&mut stream, &ext.node);
                stream.out().to_vec()
            }
            Node::Hash(_) => unreachable!("hash nodes are written by reference"),
        }
    }

    fn decode_node(data: &[u8]) -> TrieResult<Node> {
        let r = Rlp::new(data);

        match r.prototype()? {
            Prototype::Data(0) => Ok(Node::Empty),
            Prototype::List(2) => {
                let (key, is_leaf) = Nibbles::from_compact(r.at(0)?.data()?)?;

                if is_leaf {
                    Ok(Node::from_leaf(key, r.at(1)?.data()?.to_vec()))
                } else {
                    let n = Self::decode_node(r.at(1)?.as_raw())?;
                    Ok(Node::from_extension(key, n))
                }
            }
            Prototype::List(17) => {
                let mut nodes = empty_children();
                for (i, node) in nodes.iter_mut().enumerate() {
                    *node = Self::decode_node(r.at(i)?.as_raw())?;
                }

                // The last element is a value node.
                let value_rlp = r.at(16)?;
                let value = if value_rlp.is_empty() {
                    None
                } else {
                    Some(value_rlp.data()?.to_vec())
                };

                Ok(Node::from_branch(nodes, value))
            }
            _ => {
                if r.is_data() && r.size() == HASHED_LENGTH {
                    Ok(Node::Hash(B256::from_slice(r.data()?)))
                } else {
                    Err(TrieError::InvalidData)
                }
            }
        }
    }

    fn load_encoded(&self, hash: B256) -> TrieResult<Vec<u8>> {
        if hash == EMPTY_ROOT {
            return Ok(rlp::NULL_RLP.to_vec());
        }
        self.db
            .get(hash.as_slice())
            .map_err(|e| TrieError::DB(e.to_string()))?
            .ok_or(TrieError::MissingTrieNode {
                node_hash: hash,
                root_hash: Some(self.root_hash),
                err_key: None,
            })
    }

    fn resolve(&self, hash: B256) -> TrieResult<Node> {
        Self::decode_node(&self.load_encoded(hash)?)
    }

    fn load(&self, node: &Node) -> TrieResult<Node> {
        match node {
            Node::Hash(hash) => self.resolve(*hash),
            other => Ok(other.clone()),
        }
    }
}
